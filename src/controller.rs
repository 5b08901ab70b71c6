use crate::{
    cloud::client::HttpFetch,
    display_power::{DisplayMode, DisplayOutput},
    hardware::display::{Screen, TEXT_COLUMNS},
    scales::{CalibratedScale, LoadCell},
    server::{
        http::{read_request, write_response},
        listener::{ConnectionListener, POLL_WINDOW},
        router::RequestRouter,
    },
    state::AppState,
    storage::log_sink::LogStore,
    types::SAMPLES_PER_READING,
    wifi::time_sync::WallClock,
};
use anyhow::Context;
use embassy_time::{Instant, Timer};
use log::{debug, error, info, warn};

/// Weigh, update the screen, serve at most one request; forever.
pub struct ControlLoop<C, D, L, S, F, W> {
    scale: CalibratedScale<C>,
    screen: D,
    listener: Option<L>,
    router: RequestRouter<S, F, W>,
    state: AppState,
}

impl<C, D, L, S, F, W> ControlLoop<C, D, L, S, F, W>
where
    C: LoadCell,
    D: Screen,
    L: ConnectionListener,
    S: LogStore,
    F: HttpFetch,
    W: WallClock,
{
    /// `listener` is `None` in offline mode.
    pub fn new(
        scale: CalibratedScale<C>,
        screen: D,
        listener: Option<L>,
        router: RequestRouter<S, F, W>,
        state: AppState,
    ) -> Self {
        Self {
            scale,
            screen,
            listener,
            router,
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(&mut self) -> ! {
        info!("🔁 Entering control loop (online: {})", self.state.is_online());
        loop {
            if let Err(e) = self.tick(Instant::now()).await {
                error!("Loop iteration failed: {:#}", e);
            }
        }
    }

    /// One iteration. Sensor and display faults are logged and the iteration
    /// carries on; connection faults end it early.
    pub async fn tick(&mut self, now: Instant) -> anyhow::Result<()> {
        match self.scale.sample(SAMPLES_PER_READING, now) {
            Ok(reading) => {
                if self.state.update_weight(reading.weight_g) {
                    let outputs = self.state.display.note_activity(now);
                    self.apply(&outputs);
                }
            }
            Err(e) => warn!("⚠️ Scale read failed, keeping {}g: {}", self.state.weight_g, e),
        }

        let outputs = self.state.display.tick(now);
        self.apply(&outputs);

        let Some(listener) = self.listener.as_mut() else {
            // Offline: nothing to poll, keep the same cadence.
            Timer::after(POLL_WINDOW).await;
            return Ok(());
        };

        let Some(mut conn) = listener
            .poll(POLL_WINDOW)
            .await
            .context("connection poll failed")?
        else {
            return Ok(());
        };

        let raw = read_request(&mut conn).context("reading request")?;
        if raw.trim().is_empty() {
            // Connected but sent nothing within the read timeout.
            debug!("Closing empty connection");
            return Ok(());
        }

        let response = self
            .router
            .route(&raw, self.state.weight_g, &mut self.state.message);

        // Render after routing so the screen shows the new message.
        let mut outputs = self.state.display.note_activity(now);
        if self.state.display.mode() == DisplayMode::Active
            && !outputs.contains(&DisplayOutput::Render)
        {
            let _ = outputs.push(DisplayOutput::Render);
        }
        self.apply(&outputs);

        let len = response.body.len();
        write_response(&mut conn, response).context("writing response")?;
        debug!("Served {} bytes", len);
        Ok(())
    }

    fn apply(&mut self, outputs: &[DisplayOutput]) {
        for output in outputs {
            let result = match output {
                DisplayOutput::PowerOn => self.screen.power_on(),
                DisplayOutput::PowerOff => self.screen.power_off(),
                DisplayOutput::Render => {
                    let link = self.state.link_label();
                    self.screen.show_status(
                        self.state.weight_g,
                        self.state.message.truncated(TEXT_COLUMNS),
                        &link,
                    )
                }
            };
            if let Err(e) = result {
                warn!("⚠️ {}", e);
            }
        }
    }
}
