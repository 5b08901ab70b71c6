//! The single HTML page served by the scale

/// Full page with the two dynamic fields. The message is HTML-escaped; the
/// weight is an integer and needs no escaping.
pub fn render_home(weight_g: i64, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Calorie Scale</title>
<style>
body {{ font-family: sans-serif; text-align: center; margin: 2em; }}
.weight {{ font-size: 3em; margin: 0.5em 0; }}
.status {{ color: #555; min-height: 1.5em; }}
input, button {{ font-size: 1.2em; padding: 0.3em; }}
</style>
</head>
<body>
<h1>Calorie Scale</h1>
<div class="weight">{weight} g</div>
<p class="status">{message}</p>
<form action="/calculate" method="get">
<input type="text" name="food" placeholder="e.g. apple" autofocus>
<button type="submit">Log</button>
</form>
<p><a href="/">Refresh weight</a> | <a href="/download.csv">Download log</a></p>
</body>
</html>
"#,
        weight = weight_g,
        message = escape_html(message)
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
