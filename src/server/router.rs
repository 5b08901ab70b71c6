//! Dispatch of the three page routes: home, calculate, download

use crate::cloud::client::HttpFetch;
use crate::cloud::nutrition::{NutritionLookup, NutritionOutcome};
use crate::error::ParseError;
use crate::server::http::{Request, Response};
use crate::server::page::render_home;
use crate::storage::log_sink::{LogSink, LogStore};
use crate::types::{
    LogEntry, ServerMessage, LOG_FILE_NAME, LOG_PLACEHOLDER, MSG_INPUT_ERROR, MSG_LOOKUP_FAILED,
    MSG_NOT_FOUND,
};
use crate::wifi::time_sync::{local_timestamp, WallClock};
use log::{info, warn};

const HTML: &str = "text/html";
const CSV: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Calculate,
    Download,
}

impl Route {
    /// `/download.csv` takes precedence over `/calculate`.
    pub fn of(path: &str) -> Self {
        if path.starts_with("/download.csv") {
            Route::Download
        } else if path.starts_with("/calculate") {
            Route::Calculate
        } else {
            Route::Home
        }
    }
}

pub struct RequestRouter<S, F, W> {
    lookup: NutritionLookup,
    sink: LogSink<S>,
    fetcher: F,
    clock: W,
    gmt_offset_secs: i32,
}

impl<S: LogStore, F: HttpFetch, W: WallClock> RequestRouter<S, F, W> {
    pub fn new(
        lookup: NutritionLookup,
        sink: LogSink<S>,
        fetcher: F,
        clock: W,
        gmt_offset_secs: i32,
    ) -> Self {
        Self {
            lookup,
            sink,
            fetcher,
            clock,
            gmt_offset_secs,
        }
    }

    pub fn sink(&self) -> &LogSink<S> {
        &self.sink
    }

    /// Always produces a 200 response. Only the calculate route changes
    /// `message`.
    pub fn route(&mut self, raw: &str, weight_g: i64, message: &mut ServerMessage) -> Response {
        let request = match Request::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!("⚠️ Unparseable request ({}), serving home page", e);
                return Response::ok(HTML, render_home(weight_g, message.as_str()));
            }
        };
        info!("🌐 {} {}", request.method, request.path);

        match Route::of(&request.path) {
            Route::Download => self.download(),
            Route::Calculate => {
                match food_param(&request) {
                    Ok(food) => self.calculate(food, weight_g, message),
                    Err(e) => {
                        warn!("⚠️ {}", e);
                        message.set(MSG_INPUT_ERROR);
                    }
                }
                Response::ok(HTML, render_home(weight_g, message.as_str()))
            }
            Route::Home => Response::ok(HTML, render_home(weight_g, message.as_str())),
        }
    }

    fn calculate(&mut self, food: &str, weight_g: i64, message: &mut ServerMessage) {
        let descriptor = format!("{}g {}", weight_g, food);

        match self.lookup.lookup(&mut self.fetcher, &descriptor) {
            NutritionOutcome::Found(found) => {
                let entry = LogEntry {
                    timestamp: local_timestamp(self.clock.unix_time(), self.gmt_offset_secs),
                    food_name: found.name,
                    weight_g,
                    calories: found.calories,
                };
                self.sink.record(&entry, &mut self.fetcher);
                message.set(format!("Logged: {} ({} kcal)", entry.food_name, entry.calories));
            }
            NutritionOutcome::Unknown => message.set(MSG_NOT_FOUND),
            NutritionOutcome::Error(_) => message.set(MSG_LOOKUP_FAILED),
        }
    }

    /// Streams the log file; a missing or unreadable log gets the
    /// header-only placeholder.
    fn download(&self) -> Response {
        let response = match self.sink.store().open() {
            Ok(Some(log)) => {
                info!("📄 Sending log ({} bytes)", log.len);
                Response::stream(CSV, Box::new(log.reader), log.len)
            }
            Ok(None) => Response::ok(CSV, LOG_PLACEHOLDER.to_string()),
            Err(e) => {
                warn!("⚠️ Could not read log: {}", e);
                Response::ok(CSV, LOG_PLACEHOLDER.to_string())
            }
        };

        response.with_header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", LOG_FILE_NAME),
        )
    }
}

fn food_param(request: &Request) -> Result<&str, ParseError> {
    request
        .query_param("food")
        .map(str::trim)
        .filter(|food| !food.is_empty())
        .ok_or(ParseError::MissingParameter("food"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::client::HttpReply;
    use crate::error::LookupError;
    use crate::server::http::Body;
    use crate::storage::log_sink::tests::MemoryStore;
    use crate::types::MSG_READY;

    /// Answers nutrition queries from a fixed body, records every URL.
    struct ScriptedFetch {
        nutrition: Result<HttpReply, LookupError>,
        urls: Vec<String>,
    }

    impl ScriptedFetch {
        fn body(body: &str) -> Self {
            Self {
                nutrition: Ok(HttpReply {
                    status: 200,
                    body: body.to_string(),
                }),
                urls: Vec::new(),
            }
        }
    }

    impl HttpFetch for ScriptedFetch {
        fn get(&mut self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpReply, LookupError> {
            self.urls.push(url.to_string());
            if url.starts_with(crate::cloud::nutrition::NUTRITION_ENDPOINT) {
                self.nutrition.clone()
            } else {
                Ok(HttpReply {
                    status: 200,
                    body: String::new(),
                })
            }
        }
    }

    struct FixedClock(i64);

    impl WallClock for FixedClock {
        fn unix_time(&self) -> i64 {
            self.0
        }
    }

    const APPLE: &str = r#"{"items":[{"name":"Apple","calories":52.0}]}"#;
    // 2024-03-01 12:30 UTC
    const NOON: i64 = 1_709_296_200;

    fn router(fetch: ScriptedFetch, webhook: Option<&str>) -> RequestRouter<MemoryStore, ScriptedFetch, FixedClock> {
        RequestRouter::new(
            NutritionLookup::new("key"),
            LogSink::new(MemoryStore::default(), webhook.map(str::to_string)),
            fetch,
            FixedClock(NOON),
            0,
        )
    }

    #[test]
    fn precedence_by_path() {
        assert_eq!(Route::of("/download.csv"), Route::Download);
        assert_eq!(Route::of("/download.csv/calculate"), Route::Download);
        assert_eq!(Route::of("/calculate"), Route::Calculate);
        assert_eq!(Route::of("/"), Route::Home);
        assert_eq!(Route::of("/favicon.ico"), Route::Home);
    }

    #[test]
    fn calculate_found_logs_entry() {
        let mut router = router(ScriptedFetch::body(APPLE), None);
        let mut message = ServerMessage::default();

        let response = router.route("GET /calculate?food=apple HTTP/1.1\r\n\r\n", 10, &mut message);

        assert_eq!(response.status_line, "HTTP/1.1 200 OK");
        assert_eq!(response.content_type, "text/html");
        assert!(message.as_str().contains("Apple"));
        assert!(message.as_str().contains("52"));
        assert!(response.body.into_text().contains("Logged: Apple (52 kcal)"));
        assert_eq!(
            router.sink().store().contents.as_deref(),
            Some("2024-03-01 12:30,Apple,10,52\n")
        );
        assert_eq!(
            router.fetcher.urls[0],
            "https://api.calorieninjas.com/v1/nutrition?query=10g+apple"
        );
    }

    #[test]
    fn timestamp_uses_gmt_offset() {
        let mut router = router(ScriptedFetch::body(APPLE), None);
        router.gmt_offset_secs = 19_800;
        let mut message = ServerMessage::default();

        router.route("GET /calculate?food=apple HTTP/1.1", 10, &mut message);

        assert_eq!(
            router.sink().store().contents.as_deref(),
            Some("2024-03-01 18:00,Apple,10,52\n")
        );
    }

    #[test]
    fn found_entry_is_mirrored_to_webhook() {
        let mut router = router(ScriptedFetch::body(APPLE), Some("https://hook.example.com/log"));
        let mut message = ServerMessage::default();

        router.route("GET /calculate?food=green+apple HTTP/1.1", 150, &mut message);

        assert_eq!(router.fetcher.urls.len(), 2);
        assert_eq!(
            router.fetcher.urls[0],
            "https://api.calorieninjas.com/v1/nutrition?query=150g+green+apple"
        );
        assert!(router.fetcher.urls[1].starts_with("https://hook.example.com/log?date="));
        assert!(router.fetcher.urls[1].ends_with("&food=Apple&weight=150&calories=52"));
    }

    #[test]
    fn unknown_food_logs_nothing() {
        let mut router = router(ScriptedFetch::body(r#"{"items":[]}"#), None);
        let mut message = ServerMessage::default();

        router.route("GET /calculate?food=xyzzy HTTP/1.1", 10, &mut message);

        assert_eq!(message.as_str(), MSG_NOT_FOUND);
        assert_eq!(router.sink().store().contents, None);
    }

    #[test]
    fn lookup_failure_has_its_own_message() {
        let fetch = ScriptedFetch {
            nutrition: Err(LookupError::Transport("timeout".to_string())),
            urls: Vec::new(),
        };
        let mut router = router(fetch, Some("https://hook.example.com/log"));
        let mut message = ServerMessage::default();

        router.route("GET /calculate?food=apple HTTP/1.1", 10, &mut message);

        assert_eq!(message.as_str(), MSG_LOOKUP_FAILED);
        assert_ne!(message.as_str(), MSG_NOT_FOUND);
        assert_eq!(router.sink().store().contents, None);
        assert_eq!(router.fetcher.urls.len(), 1);
    }

    #[test]
    fn missing_or_empty_food_is_input_error() {
        for raw in [
            "GET /calculate HTTP/1.1",
            "GET /calculate?food= HTTP/1.1",
            "GET /calculate?drink=tea HTTP/1.1",
        ] {
            let mut router = router(ScriptedFetch::body(APPLE), None);
            let mut message = ServerMessage::default();

            let response = router.route(raw, 10, &mut message);

            assert_eq!(message.as_str(), MSG_INPUT_ERROR, "{}", raw);
            assert!(response.body.into_text().contains(MSG_INPUT_ERROR));
            assert!(router.fetcher.urls.is_empty());
        }
    }

    #[test]
    fn download_without_log_returns_placeholder() {
        let mut router = router(ScriptedFetch::body(APPLE), None);
        let mut message = ServerMessage::default();

        let response = router.route("GET /download.csv HTTP/1.1", 0, &mut message);

        assert_eq!(response.content_type, "text/csv");
        assert_eq!(
            response.headers,
            vec![(
                "Content-Disposition",
                "attachment; filename=\"food_log.csv\"".to_string()
            )]
        );
        assert_eq!(message.as_str(), MSG_READY);
        assert_eq!(response.body.into_text(), "Date,Food,Weight,Calories\n");
    }

    #[test]
    fn download_returns_log_contents() {
        let mut router = router(ScriptedFetch::body(APPLE), None);
        let mut message = ServerMessage::default();
        router.route("GET /calculate?food=apple HTTP/1.1", 10, &mut message);

        let response = router.route("GET /download.csv?food=apple HTTP/1.1", 10, &mut message);

        assert!(matches!(response.body, Body::Stream { len: 29, .. }));
        assert_eq!(response.body.into_text(), "2024-03-01 12:30,Apple,10,52\n");
    }

    #[test]
    fn home_keeps_message() {
        let mut router = router(ScriptedFetch::body(APPLE), None);
        let mut message = ServerMessage::default();
        message.set("Food not found");

        let response = router.route("GET / HTTP/1.1", 0, &mut message);

        assert_eq!(message.as_str(), "Food not found");
        let page = response.body.into_text();
        assert!(page.contains("Food not found"));
        assert!(page.contains("0 g"));
    }

    #[test]
    fn garbage_request_still_renders_home() {
        let mut router = router(ScriptedFetch::body(APPLE), None);
        let mut message = ServerMessage::default();

        let response = router.route("\u{0}\u{1}", 7, &mut message);

        assert_eq!(response.status_line, "HTTP/1.1 200 OK");
        assert!(response.body.into_text().contains("7 g"));
    }
}
