// Dashboard application state
//
// Holds the UI-only state (selected row, toast, quit flag) and turns key
// presses into engine calls. Engine calls run on spawned tasks so a slow
// dialer never blocks drawing; their outcome comes back as DispatchEvents
// or shows up in the cache views on the next frame.

use super::components::Toast;
use dialdeck::dispatch::{DispatchEvent, SessionAction};
use dialdeck::logging::LogBuffer;
use dialdeck::Dashboard;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Spinner frames for loading indicators
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub struct App {
    pub dashboard: Arc<Dashboard>,
    pub log_buffer: LogBuffer,
    pub api_url: String,

    /// Row of the displayed page the cursor is on
    pub selected_row: usize,

    pub toast: Option<Toast>,

    pub should_quit: bool,

    /// When the app started (for uptime display)
    pub start_time: Instant,

    spinner_frame: usize,
}

impl App {
    pub fn new(dashboard: Arc<Dashboard>, log_buffer: LogBuffer, api_url: String) -> Self {
        Self {
            dashboard,
            log_buffer,
            api_url,
            selected_row: 0,
            toast: None,
            should_quit: false,
            start_time: Instant::now(),
            spinner_frame: 0,
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER[self.spinner_frame % SPINNER.len()]
    }

    /// Periodic housekeeping: animation, toast expiry, cursor bounds
    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);

        if self.toast.as_ref().is_some_and(|t| t.is_expired()) {
            self.toast = None;
        }

        let rows = self.dashboard.leads.view().page.leads.len();
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(task);
    }

    /// Load the first page and the campaign list
    pub fn initial_load(&self) {
        let dash = self.dashboard.clone();
        self.spawn(async move {
            futures::join!(dash.go_to_page(1), dash.campaigns.list_campaigns());
        });
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,

            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_row = self.selected_row.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let rows = self.dashboard.leads.view().page.leads.len();
                if self.selected_row + 1 < rows {
                    self.selected_row += 1;
                }
            }

            KeyCode::Left => self.change_page(false),
            KeyCode::Right => self.change_page(true),

            KeyCode::Enter => self.start_selected(),
            KeyCode::Char('n') => self.call_next(),

            KeyCode::Char('c') => self.cycle_campaign(),
            KeyCode::Char('r') => {
                let dash = self.dashboard.clone();
                self.spawn(async move {
                    dash.refresh_all().await;
                });
                self.toast = Some(Toast::info("Refreshing"));
            }

            KeyCode::Char('e') => self.session(SessionAction::EndCall { auto_next: true }),
            KeyCode::Char('E') => self.session(SessionAction::EndCall { auto_next: false }),
            KeyCode::Char('s') => self.session(SessionAction::StopAll),
            KeyCode::Char('a') => {
                let enabled = !self.dashboard.status.get_status().auto_next;
                self.session(SessionAction::AutoNext(enabled));
            }
            _ => {}
        }
    }

    fn change_page(&mut self, forward: bool) {
        let pager = self.dashboard.pager();
        if (forward && !pager.has_next()) || (!forward && !pager.has_prev()) {
            return;
        }
        self.selected_row = 0;
        let dash = self.dashboard.clone();
        self.spawn(async move {
            if forward {
                dash.next_page().await;
            } else {
                dash.prev_page().await;
            }
        });
    }

    /// True (with a toast) while any start is awaiting acknowledgment
    fn start_pending(&mut self) -> bool {
        match self.dashboard.dispatcher.in_flight() {
            Some(pending) => {
                self.toast = Some(Toast::info(format!(
                    "Still starting lead #{}",
                    pending + 1
                )));
                true
            }
            None => false,
        }
    }

    fn start_selected(&mut self) {
        let row = self.selected_row;
        let Some(index) = self.dashboard.leads.global_index(row) else {
            self.toast = Some(Toast::error("No lead on this row"));
            return;
        };
        if self.dashboard.dispatcher.is_starting(index) || self.start_pending() {
            return;
        }
        let dash = self.dashboard.clone();
        self.spawn(async move {
            let _ = dash.start_row(row).await;
        });
    }

    fn call_next(&mut self) {
        if self.start_pending() {
            return;
        }
        let dash = self.dashboard.clone();
        self.spawn(async move {
            let _ = dash.call_next().await;
        });
    }

    fn cycle_campaign(&mut self) {
        let campaigns = &self.dashboard.campaigns;
        if campaigns.cycle().is_none() {
            self.toast = Some(Toast::error("No campaigns loaded"));
            return;
        }
        let label = campaigns.selected_label().unwrap_or_default();
        self.toast = Some(Toast::info(format!("Campaign: {}", label)));

        // Auto-next on the server uses its own remembered campaign
        let dash = self.dashboard.clone();
        self.spawn(async move {
            if let Err(e) = dash.campaigns.publish().await {
                tracing::warn!(error = %e, "Could not send campaign to dialer");
            }
        });
    }

    fn session(&mut self, action: SessionAction) {
        let dash = self.dashboard.clone();
        self.spawn(async move {
            let dispatcher = &dash.dispatcher;
            let _ = match action {
                SessionAction::EndCall { auto_next } => dispatcher.end_call(auto_next).await,
                SessionAction::StopAll => dispatcher.stop_all().await,
                SessionAction::AutoNext(enabled) => dispatcher.set_auto_next(enabled).await,
            };
        });
    }

    /// Turn a dispatcher notification into a toast
    pub fn handle_dispatch_event(&mut self, event: DispatchEvent) {
        self.toast = Some(match event {
            DispatchEvent::Started { index, ack, .. } => {
                let label = ack
                    .campaign_label
                    .or(ack.campaign)
                    .map(|c| format!(" ({})", c))
                    .unwrap_or_default();
                Toast::info(format!("Calling lead #{}{}", index + 1, label))
            }
            DispatchEvent::Rejected(err) => Toast::error(err.user_message()),
            DispatchEvent::SessionChanged { action, .. } => Toast::info(action.describe()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::components::ToastKind;
    use dialdeck::clock::system_clock;
    use dialdeck::error::ApiError;
    use dialdeck::model::StartAck;
    use dialdeck::transport::HttpDialerApi;
    use dialdeck::{DispatchError, EngineSettings};
    use std::time::Duration;

    fn app() -> App {
        // Nothing in these tests reaches the network
        let api = HttpDialerApi::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let dashboard = Dashboard::new(Arc::new(api), EngineSettings::default(), system_clock());
        App::new(Arc::new(dashboard), LogBuffer::new(), "http://127.0.0.1:9".into())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn cursor_stays_on_empty_page() {
        let mut app = app();
        app.handle_key(press(KeyCode::Down));
        app.handle_key(press(KeyCode::Up));
        assert_eq!(app.selected_row, 0);
    }

    #[test]
    fn enter_on_missing_row_shows_error() {
        let mut app = app();
        app.handle_key(press(KeyCode::Enter));
        assert!(matches!(
            app.toast.as_ref().map(|t| t.kind),
            Some(ToastKind::Error)
        ));
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        app.handle_key(press(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = self::app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn dispatch_events_become_toasts() {
        let mut app = app();

        app.handle_dispatch_event(DispatchEvent::Started {
            index: 30,
            campaign: "solar".into(),
            ack: StartAck {
                campaign_label: Some("Solar Savings".into()),
                ..StartAck::default()
            },
        });
        assert_eq!(
            app.toast.as_ref().map(|t| t.message.as_str()),
            Some("Calling lead #31 (Solar Savings)")
        );

        app.handle_dispatch_event(DispatchEvent::Rejected(DispatchError::new(
            Some(30),
            ApiError::Conflict("busy".into()),
        )));
        let toast = app.toast.as_ref().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert!(toast.message.contains("already running"));
    }

    #[tokio::test]
    async fn call_next_is_ignored_while_a_start_is_pending() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        // Accepts connections but never answers, so the start stays pending
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let accepted = connections.clone();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                open.push(socket);
            }
        });

        let api = HttpDialerApi::new(&url, Duration::from_secs(30)).unwrap();
        let dashboard = Dashboard::new(Arc::new(api), EngineSettings::default(), system_clock());
        let mut app = App::new(Arc::new(dashboard), LogBuffer::new(), url);

        app.handle_key(press(KeyCode::Char('n')));
        while connections.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(app.dashboard.dispatcher.in_flight(), Some(0));

        app.handle_key(press(KeyCode::Char('n')));
        let toast = app.toast.as_ref().unwrap();
        assert_eq!(toast.kind, ToastKind::Info);
        assert_eq!(toast.message, "Still starting lead #1");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(connections.load(Ordering::SeqCst), 1);
        assert_eq!(app.dashboard.dispatcher.in_flight(), Some(0));
    }
}
