use std::path::PathBuf;

use crossterm::event::Event;
use ratatui::Terminal;
use ratatui::prelude::Backend;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::profiles::{ConnectionProfile, Credential, ProfileStore};
use crate::config::settings::AppSettings;
use crate::config::snippets::{CommandSnippet, SnippetStore};
use crate::error::{AppError, Result};
use crate::events::AppEvent;
use crate::key_event::KeyFlow;
use crate::keygen;
use crate::session::{
    CloseReason, ConnectOptions, ConnectedSession, ControlInput, LaunchSecret, RelayEvent,
    RemoteSession, SessionId, SessionRegistry, SshTransport,
};
use crate::transfer::{self, TransferReport};
use crate::ui::{KeyGenField, KeyGenState, PromptForm, SessionView};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    Main,
    KeyGen,
}

/// Which panel of the main screen receives keys
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pane {
    Connections,
    Snippets,
    Session,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptKind {
    NewConnection,
    /// Collect the password or key passphrase for a launch
    Launch { index: usize, password: bool },
    NewSnippet,
    Upload { session: SessionId },
    Download { session: SessionId },
    SaveKeyPair,
}

pub struct Prompt {
    pub kind: PromptKind,
    pub form: PromptForm,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingDelete {
    Connection(usize),
    Snippet(String),
}

/// App is the main application
pub struct App {
    pub screen: Screen,
    pub focus: Pane,
    pub profiles: ProfileStore,
    pub snippets: SnippetStore,
    pub registry: SessionRegistry,
    pub views: Vec<SessionView>,
    pub active_view: usize,
    pub selected_profile: usize,
    pub selected_snippet: usize,
    pub prompt: Option<Prompt>,
    pub pending_delete: Option<PendingDelete>,
    pub keygen: KeyGenState,
    pub error: Option<AppError>,
    pub info: Option<String>,
    /// Labels of launches still connecting
    pub connecting: Vec<String>,
    pub transfers_in_flight: usize,
    settings: AppSettings,
    options: ConnectOptions,
    events: mpsc::Sender<AppEvent>,
}

impl App {
    pub fn new(
        settings: AppSettings,
        options: ConnectOptions,
        profiles: ProfileStore,
        snippets: SnippetStore,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        let info = snippets.notice().map(str::to_string);
        Self {
            screen: Screen::Main,
            focus: Pane::Connections,
            profiles,
            snippets,
            registry: SessionRegistry::new(),
            views: Vec::new(),
            active_view: 0,
            selected_profile: 0,
            selected_snippet: 0,
            prompt: None,
            pending_delete: None,
            keygen: KeyGenState::default(),
            error: None,
            info,
            connecting: Vec::new(),
            transfers_in_flight: 0,
            settings,
            options,
            events,
        }
    }

    pub async fn run<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|f| crate::ui::draw(f, self))?;

            let ev = match rx.recv().await {
                Some(e) => e,
                None => {
                    warn!("App event channel closed");
                    break;
                }
            };
            if let KeyFlow::Quit = self.handle_event(ev) {
                info!("Quit requested");
                break;
            }
        }
        self.shutdown();
        Ok(())
    }

    pub fn handle_event(&mut self, ev: AppEvent) -> KeyFlow {
        match ev {
            AppEvent::Input(Event::Key(key)) => return crate::key_event::handle_key_event(self, key),
            AppEvent::Input(Event::Paste(text)) => self.on_paste(&text),
            AppEvent::Input(_) | AppEvent::Tick => {}
            AppEvent::Relay(event) => self.on_relay_event(event),
            AppEvent::SessionOpened { label, result } => self.on_session_opened(label, result),
            AppEvent::TransferFinished { session, result } => {
                self.on_transfer_finished(session, result)
            }
        }
        KeyFlow::Continue
    }

    /// Store an action's error for the error popup.
    pub fn report(&mut self, result: Result<()>) {
        if let Err(e) = result {
            error!("{}", e);
            self.error = Some(e);
        }
    }

    pub fn shutdown(&mut self) {
        info!("Closing {} open sessions", self.registry.len());
        self.registry.close_all();
    }

    fn on_paste(&mut self, text: &str) {
        // Prompt fields and the passphrase are single-line
        let single_line: String = text.lines().collect();
        if let Some(prompt) = &mut self.prompt {
            if let Some(input) = prompt.form.focused_textarea_mut() {
                input.insert_str(&single_line);
            }
        } else if self.screen == Screen::KeyGen && self.keygen.focus == KeyGenField::Passphrase {
            self.keygen.passphrase.insert_str(&single_line);
        } else if self.screen == Screen::Main
            && self.focus == Pane::Session
            && let Some(view) = self.views.get_mut(self.active_view)
        {
            view.input.insert_str(text);
        }
    }

    // Connection profiles

    pub fn add_connection(&mut self, host: &str, username: &str, key_path: &str) -> Result<()> {
        let host = host.trim();
        let username = username.trim();
        if host.is_empty() || username.is_empty() {
            return Err(AppError::ValidationError(
                "Host and username are required".to_string(),
            ));
        }
        let credential = match key_path.trim() {
            "" => Credential::PasswordPrompt,
            path => Credential::KeyFile(path.to_string()),
        };
        let profile = ConnectionProfile::new(host.to_string(), username.to_string(), credential);
        info!("Adding connection {}", profile.display_name());
        self.profiles.add(profile)?;
        self.selected_profile = self.profiles.len() - 1;
        Ok(())
    }

    /// Removing a profile leaves sessions opened from it running.
    pub fn remove_connection(&mut self, index: usize) -> Result<()> {
        let removed = self.profiles.remove(index)?;
        info!("Removed connection {}", removed.display_name());
        self.selected_profile = self
            .selected_profile
            .min(self.profiles.len().saturating_sub(1));
        Ok(())
    }

    /// Start connecting in the background; the result arrives as `SessionOpened`.
    pub fn launch_session(&mut self, index: usize, secret: LaunchSecret) -> Result<()> {
        let profile = self
            .profiles
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::ValidationError("No connection selected".to_string()))?;
        if profile.credential == Credential::PasswordPrompt
            && secret.password.as_deref().is_none_or(str::is_empty)
        {
            return Err(AppError::ValidationError("Password is required".to_string()));
        }

        let options = self.options.clone();
        let tx = self.events.clone();
        let label = profile.host.clone();
        self.connecting.push(label.clone());
        info!("Launching session to {}", profile.display_name());

        tokio::spawn(async move {
            let result = RemoteSession::open(&profile, &secret, &options).await;
            if tx
                .send(AppEvent::SessionOpened { label, result })
                .await
                .is_err()
            {
                debug!("App gone before session opened");
            }
        });
        Ok(())
    }

    fn on_session_opened(&mut self, label: String, result: Result<ConnectedSession>) {
        if let Some(pos) = self.connecting.iter().position(|l| *l == label) {
            self.connecting.remove(pos);
        }
        match result {
            Ok(connected) => {
                self.attach_session(connected);
            }
            Err(e) => {
                error!("Failed to open session to {}: {}", label, e);
                self.error = Some(e);
            }
        }
    }

    /// Register an opened session and give it a focused tab.
    pub fn attach_session(&mut self, connected: ConnectedSession) -> SessionId {
        let title = connected.session.label().to_string();
        let id = self.registry.register(connected, self.events.clone());
        self.views
            .push(SessionView::new(id, title, self.settings.scrollback_lines));
        self.active_view = self.views.len() - 1;
        self.focus = Pane::Session;
        id
    }

    // Sessions

    pub fn focused_session(&self) -> Option<SessionId> {
        self.views.get(self.active_view).map(|v| v.id)
    }

    fn view_mut(&mut self, id: SessionId) -> Option<&mut SessionView> {
        self.views.iter_mut().find(|v| v.id == id)
    }

    fn route_focused(&self, data: &[u8]) -> Result<()> {
        let id = self
            .focused_session()
            .ok_or_else(|| AppError::RoutingError("No session is open".to_string()))?;
        self.registry.route(id, data)
    }

    /// Send the focused input line followed by a newline.
    pub fn submit_input(&mut self) -> Result<()> {
        let Some(view) = self.views.get_mut(self.active_view) else {
            return Err(AppError::RoutingError("No session is open".to_string()));
        };
        let text = view.input_text().trim().to_string();
        view.set_input("");
        view.history.on_submit(&text);
        if text.is_empty() {
            return Ok(());
        }

        self.registry.route(view.id, format!("{text}\n").as_bytes())?;
        view.log_command(&text);
        Ok(())
    }

    pub fn history_up(&mut self) {
        if let Some(view) = self.views.get_mut(self.active_view) {
            let step = view.history.navigate_up();
            view.apply_history(step);
        }
    }

    pub fn history_down(&mut self) {
        if let Some(view) = self.views.get_mut(self.active_view) {
            let step = view.history.navigate_down();
            view.apply_history(step);
        }
    }

    pub fn send_control(&mut self, control: ControlInput) -> Result<()> {
        debug!("Sending {:?} to focused session", control);
        self.route_focused(&[control.byte()])
    }

    /// Close a session tab, cancelling its relay and dropping the connection.
    pub fn close_session_view(&mut self, index: usize) -> Result<()> {
        if index >= self.views.len() {
            return Err(AppError::RoutingError(format!("No session tab {index}")));
        }
        let view = self.views.remove(index);
        if self.registry.contains(view.id) {
            self.registry.close(view.id)?;
        }
        info!("Closed session tab {}", view.title);

        if self.views.is_empty() {
            self.active_view = 0;
            self.focus = Pane::Connections;
        } else if self.active_view >= self.views.len() {
            self.active_view = self.views.len() - 1;
        }
        Ok(())
    }

    pub fn next_view(&mut self) {
        if !self.views.is_empty() {
            self.active_view = (self.active_view + 1) % self.views.len();
        }
    }

    pub fn prev_view(&mut self) {
        if !self.views.is_empty() {
            self.active_view = (self.active_view + self.views.len() - 1) % self.views.len();
        }
    }

    fn on_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Output { id, text } => match self.view_mut(id) {
                Some(view) => view.output.push_str(&text),
                None => debug!(session = %id, "Output for a closed tab dropped"),
            },
            RelayEvent::Closed { id, reason } => {
                if let Some(session) = self.registry.unregister(id) {
                    session.close();
                }
                if let Some(view) = self.view_mut(id) {
                    let message = match &reason {
                        CloseReason::Eof => format!("Session {} was closed by the remote host", view.title),
                        CloseReason::Error(e) => format!("Session {} failed: {}", view.title, e),
                    };
                    view.closed = Some(reason);
                    self.info = Some(message);
                }
            }
        }
    }

    // Snippets

    pub fn add_snippet(&mut self, name: &str, command: &str, description: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() || command.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Name and command are required".to_string(),
            ));
        }
        self.snippets.add(CommandSnippet::new(
            name.to_string(),
            command.to_string(),
            description.trim().to_string(),
        ))?;
        self.selected_snippet = self.snippets.len() - 1;
        Ok(())
    }

    /// Remove every snippet named `name`.
    pub fn remove_snippet(&mut self, name: &str) -> Result<()> {
        let removed = self.snippets.remove(name)?;
        info!("Removed {} command(s) named {}", removed, name);
        self.selected_snippet = self
            .selected_snippet
            .min(self.snippets.len().saturating_sub(1));
        Ok(())
    }

    /// Send the command of the last snippet called `name` to the focused session.
    pub fn execute_snippet(&mut self, name: &str) -> Result<()> {
        let command = self
            .snippets
            .find(name)
            .map(|s| s.command.clone())
            .ok_or_else(|| AppError::ValidationError(format!("No command named {name}")))?;
        self.route_focused(format!("{command}\n").as_bytes())?;
        if let Some(view) = self.views.get_mut(self.active_view) {
            view.log_command(&command);
        }
        Ok(())
    }

    // File transfer

    fn transport_for(&self, id: SessionId) -> Result<SshTransport> {
        self.registry
            .lookup(id)
            .ok_or_else(|| AppError::RoutingError(format!("No open session {id}")))?
            .transport()
            .cloned()
            .ok_or_else(|| AppError::TransferError("Session has no SSH connection".to_string()))
    }

    pub fn start_upload(&mut self, session: SessionId, local: &str, remote_dir: &str) -> Result<()> {
        let transport = self.transport_for(session)?;
        let local = crate::expand_tilde(local.trim());
        let remote_dir = remote_dir.trim().to_string();
        let tx = self.events.clone();
        self.transfers_in_flight += 1;

        tokio::spawn(async move {
            let result = transfer::upload(&transport, &local, &remote_dir).await;
            let _ = tx.send(AppEvent::TransferFinished { session, result }).await;
        });
        Ok(())
    }

    pub fn start_download(&mut self, session: SessionId, remote: &str, local_dir: &str) -> Result<()> {
        let transport = self.transport_for(session)?;
        let remote = remote.trim().to_string();
        let local_dir = crate::expand_tilde(local_dir.trim());
        let tx = self.events.clone();
        self.transfers_in_flight += 1;

        tokio::spawn(async move {
            let result = transfer::download(&transport, &remote, &local_dir).await;
            let _ = tx.send(AppEvent::TransferFinished { session, result }).await;
        });
        Ok(())
    }

    fn on_transfer_finished(&mut self, session: SessionId, result: Result<TransferReport>) {
        self.transfers_in_flight = self.transfers_in_flight.saturating_sub(1);
        match result {
            Ok(report) => {
                info!(session = %session, "{}", report);
                self.info = Some(report.to_string());
            }
            Err(e) => {
                error!(session = %session, "Transfer failed: {}", e);
                self.error = Some(e);
            }
        }
    }

    // Key generation

    pub fn generate_key(&mut self) -> Result<()> {
        let spec = self.keygen.spec()?;
        let passphrase = self.keygen.passphrase();
        let key = keygen::generate(&spec, Some(&passphrase), "")?;
        self.keygen.generated = Some(key);
        Ok(())
    }

    /// Write the generated pair; an empty public path means `<private>.pub`.
    pub fn save_generated_key(&mut self, private_path: &str, public_path: &str) -> Result<()> {
        let key = self.keygen.generated.as_ref().ok_or_else(|| {
            AppError::KeyGenerationError("Generate a key before saving".to_string())
        })?;
        let private = crate::expand_tilde(private_path.trim());
        let public = match public_path.trim() {
            "" => {
                let mut p = private.clone().into_os_string();
                p.push(".pub");
                PathBuf::from(p)
            }
            path => crate::expand_tilde(path),
        };
        keygen::save_private_key(key, &private)?;
        keygen::save_public_key(key, &public)?;
        self.info = Some(format!(
            "Saved private key to {} and public key to {}",
            private.display(),
            public.display()
        ));
        Ok(())
    }

    // Prompts

    pub fn open_prompt(&mut self, kind: PromptKind) {
        let form = match &kind {
            PromptKind::NewConnection => PromptForm::new("New Connection")
                .field("Host", "hostname, host:port or [v6addr]:port", true)
                .field("Username", "Enter username", true)
                .field("Private key path", "Leave empty to use a password", false),
            PromptKind::Launch { password: true, .. } => {
                PromptForm::new("Connect").secret("Password", "Enter password", true)
            }
            PromptKind::Launch { password: false, .. } => PromptForm::new("Connect").secret(
                "Key passphrase",
                "Leave empty if the key is not encrypted",
                false,
            ),
            PromptKind::NewSnippet => PromptForm::new("New Command")
                .field("Name", "Enter command name", true)
                .field("Command", "e.g. df -h", true)
                .field("Description", "What it does", false),
            PromptKind::Upload { .. } => PromptForm::new("Upload File")
                .field("Local file", "Path of the file to upload", true)
                .field("Remote directory", "Directory on the remote host", true)
                .prefill("."),
            PromptKind::Download { .. } => PromptForm::new("Download File")
                .field("Remote file", "Path of the file to download", true)
                .field("Local directory", "Directory to save into", true)
                .prefill("."),
            PromptKind::SaveKeyPair => {
                let default = format!("~/.ssh/{}", self.keygen.algorithm().default_file_name());
                PromptForm::new("Save Key Pair")
                    .field("Private key file", "Where to write the private key", true)
                    .prefill(default)
                    .field("Public key file", "Empty for <private key file>.pub", false)
            }
        };
        self.prompt = Some(Prompt { kind, form });
    }

    /// Open the launch prompt for the selected connection.
    pub fn launch_selected(&mut self) {
        if let Some(profile) = self.profiles.get(self.selected_profile) {
            let password = profile.credential == Credential::PasswordPrompt;
            self.open_prompt(PromptKind::Launch {
                index: self.selected_profile,
                password,
            });
        }
    }

    pub fn submit_prompt(&mut self) {
        let Some(mut prompt) = self.prompt.take() else {
            return;
        };
        if let Err(msg) = prompt.form.validate() {
            prompt.form.error = Some(msg);
            self.prompt = Some(prompt);
            return;
        }

        let form = &prompt.form;
        let result = match prompt.kind {
            PromptKind::NewConnection => {
                self.add_connection(&form.value(0), &form.value(1), &form.value(2))
            }
            PromptKind::Launch { index, password } => {
                let value = form.value(0);
                let secret = if password {
                    LaunchSecret {
                        password: Some(value),
                        passphrase: None,
                    }
                } else {
                    LaunchSecret {
                        password: None,
                        passphrase: (!value.is_empty()).then_some(value),
                    }
                };
                self.launch_session(index, secret)
            }
            PromptKind::NewSnippet => {
                self.add_snippet(&form.value(0), &form.value(1), &form.value(2))
            }
            PromptKind::Upload { session } => {
                self.start_upload(session, &form.value(0), &form.value(1))
            }
            PromptKind::Download { session } => {
                self.start_download(session, &form.value(0), &form.value(1))
            }
            PromptKind::SaveKeyPair => self.save_generated_key(&form.value(0), &form.value(1)),
        };
        self.report(result);
    }

    pub fn confirm_delete(&mut self) {
        let result = match self.pending_delete.take() {
            Some(PendingDelete::Connection(index)) => self.remove_connection(index),
            Some(PendingDelete::Snippet(name)) => self.remove_snippet(&name),
            None => Ok(()),
        };
        self.report(result);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, DuplexStream};

    use super::*;
    use crate::config::snippets::NO_SNIPPETS_NOTICE;

    fn test_app(dir: &Path) -> (App, mpsc::Receiver<AppEvent>) {
        let settings = AppSettings {
            known_hosts_path: Some(dir.join("known_hosts").display().to_string()),
            ..AppSettings::default()
        };
        let options = ConnectOptions::from_settings(&settings).unwrap();
        let profiles = ProfileStore::open(dir.join("connections.json")).unwrap();
        let snippets = SnippetStore::open(dir.join("commands.json")).unwrap();
        let (tx, rx) = mpsc::channel(64);
        (App::new(settings, options, profiles, snippets, tx), rx)
    }

    fn attach(app: &mut App, label: &str) -> (SessionId, DuplexStream) {
        let (client, server) = tokio::io::duplex(1024);
        let connected = RemoteSession::attach(SessionId::new(), label.to_string(), client, None);
        (app.attach_session(connected), server)
    }

    async fn read_some(server: &mut DuplexStream) -> Vec<u8> {
        let mut buf = vec![0u8; 256];
        let n = tokio::time::timeout(Duration::from_secs(2), server.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        buf.truncate(n);
        buf
    }

    async fn assert_silent(server: &mut DuplexStream) {
        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_millis(100), server.read(&mut buf)).await;
        assert!(read.is_err(), "unexpected bytes delivered");
    }

    #[tokio::test]
    async fn test_absent_snippet_file_shows_notice() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _rx) = test_app(dir.path());
        assert!(app.snippets.is_empty());
        assert_eq!(app.info.as_deref(), Some(NO_SNIPPETS_NOTICE));
        assert!(app.error.is_none());
    }

    #[tokio::test]
    async fn test_control_input_goes_to_focused_session() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        let (_a, mut server_a) = attach(&mut app, "alpha");
        let (_b, mut server_b) = attach(&mut app, "beta");

        // The newest tab is focused
        app.send_control(ControlInput::Interrupt).unwrap();
        assert_eq!(read_some(&mut server_b).await, vec![0x03]);
        assert_silent(&mut server_a).await;

        app.prev_view();
        app.send_control(ControlInput::EndOfInput).unwrap();
        assert_eq!(read_some(&mut server_a).await, vec![0x04]);
        assert_silent(&mut server_b).await;
    }

    #[tokio::test]
    async fn test_control_input_without_session_is_routing_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        assert!(matches!(
            app.send_control(ControlInput::Interrupt),
            Err(AppError::RoutingError(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_input_sends_line_and_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        let (_id, mut server) = attach(&mut app, "alpha");

        app.views[0].set_input("ls -la");
        app.submit_input().unwrap();
        assert_eq!(read_some(&mut server).await, b"ls -la\n");

        let view = &app.views[0];
        assert_eq!(view.input_text(), "");
        assert_eq!(view.history.entries(), &["ls -la".to_string()]);
        assert_eq!(view.command_log.len(), 1);
        assert_eq!(view.command_log[0].command, "ls -la");

        app.submit_input().unwrap();
        assert_silent(&mut server).await;

        app.views[0].set_input("   ");
        app.submit_input().unwrap();
        assert_silent(&mut server).await;
        assert_eq!(app.views[0].history.entries().len(), 1);

        app.views[0].set_input("  uptime  ");
        app.submit_input().unwrap();
        assert_eq!(read_some(&mut server).await, b"uptime\n");
        assert_eq!(app.views[0].history.entries()[1], "uptime");

        app.history_up();
        assert_eq!(app.views[0].input_text(), "uptime");
        app.history_up();
        assert_eq!(app.views[0].input_text(), "ls -la");
        app.history_down();
        app.history_down();
        assert_eq!(app.views[0].input_text(), "");
    }

    #[tokio::test]
    async fn test_execute_snippet_sends_last_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        app.add_snippet("up", "uptime", "").unwrap();
        app.add_snippet("up", "uptime -p", "pretty").unwrap();
        let (_a, mut server_a) = attach(&mut app, "alpha");
        let (_b, mut server_b) = attach(&mut app, "beta");

        app.execute_snippet("up").unwrap();
        assert_eq!(read_some(&mut server_b).await, b"uptime -p\n");
        assert_silent(&mut server_a).await;

        app.remove_snippet("up").unwrap();
        assert!(app.snippets.is_empty());
        assert!(matches!(
            app.execute_snippet("up"),
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_output_reaches_only_its_view() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx) = test_app(dir.path());
        let (a, _server_a) = attach(&mut app, "alpha");
        let (_b, mut server_b) = attach(&mut app, "beta");

        tokio::io::AsyncWriteExt::write_all(&mut server_b, b"\x1b[1mbeta says hi\x1b[0m")
            .await
            .unwrap();
        let ev = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        app.handle_event(ev);

        assert_eq!(app.views[1].output.text(), "beta says hi");
        assert!(app.views[0].output.is_empty());
        assert_eq!(app.views[0].id, a);
    }

    #[tokio::test]
    async fn test_remote_close_unregisters_and_keeps_view() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx) = test_app(dir.path());
        let (id, server) = attach(&mut app, "alpha");

        drop(server);
        let ev = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        app.handle_event(ev);

        assert!(!app.registry.contains(id));
        assert_eq!(app.views.len(), 1);
        assert_eq!(app.views[0].closed, Some(CloseReason::Eof));
        assert!(app.info.is_some());

        app.views[0].set_input("ls");
        assert!(matches!(app.submit_input(), Err(AppError::RoutingError(_))));
    }

    #[tokio::test]
    async fn test_read_error_closes_view_and_frees_slot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx) = test_app(dir.path());
        let connected = RemoteSession::attach(
            SessionId::new(),
            "flaky".to_string(),
            crate::session::test_support::BrokenChannel,
            None,
        );
        let id = app.attach_session(connected);

        let ev = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        app.handle_event(ev);

        assert!(!app.registry.contains(id));
        assert!(app.registry.is_empty());
        assert!(matches!(app.views[0].closed, Some(CloseReason::Error(_))));
        assert!(app.info.as_deref().is_some_and(|m| m.contains("failed")));
    }

    #[tokio::test]
    async fn test_close_tab_cancels_session() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        let (id, mut server) = attach(&mut app, "alpha");

        app.close_session_view(0).unwrap();
        assert!(app.views.is_empty());
        assert!(!app.registry.contains(id));
        assert_eq!(app.focus, Pane::Connections);

        let mut rest = Vec::new();
        let n = tokio::time::timeout(Duration::from_secs(2), server.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_removing_profile_keeps_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        app.add_connection("alpha.example", "me", "").unwrap();
        let (id, mut server) = attach(&mut app, "alpha.example");

        app.remove_connection(0).unwrap();
        assert!(app.profiles.is_empty());
        assert!(app.registry.contains(id));

        app.send_control(ControlInput::Interrupt).unwrap();
        assert_eq!(read_some(&mut server).await, vec![0x03]);
    }

    #[tokio::test]
    async fn test_connection_validation_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        assert!(matches!(
            app.add_connection("  ", "me", ""),
            Err(AppError::ValidationError(_))
        ));
        app.add_connection("db.internal:2222", "admin", "~/.ssh/id_ed25519")
            .unwrap();

        let stored = ProfileStore::load(&dir.path().join("connections.json")).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(
            stored[0].credential,
            Credential::KeyFile("~/.ssh/id_ed25519".to_string())
        );
    }

    #[tokio::test]
    async fn test_launch_with_password_profile_needs_password() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        app.add_connection("alpha.example", "me", "").unwrap();
        assert!(matches!(
            app.launch_session(0, LaunchSecret::default()),
            Err(AppError::ValidationError(_))
        ));
        assert!(app.connecting.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_validation_keeps_prompt_open() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        app.open_prompt(PromptKind::NewSnippet);
        app.submit_prompt();
        let prompt = app.prompt.as_ref().unwrap();
        assert_eq!(prompt.form.error.as_deref(), Some("Name is required"));
    }

    #[tokio::test]
    async fn test_multiline_paste_into_prompt_keeps_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        app.open_prompt(PromptKind::NewSnippet);
        app.handle_event(AppEvent::Input(Event::Paste("disk\r\nusage\n".to_string())));

        let prompt = app.prompt.as_ref().unwrap();
        assert_eq!(prompt.form.value(0), "diskusage");
    }

    #[tokio::test]
    async fn test_generate_and_save_key() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        assert!(matches!(
            app.save_generated_key("/tmp/x", ""),
            Err(AppError::KeyGenerationError(_))
        ));

        // Ed25519 is last in the selector
        app.keygen.cycle(false);
        app.generate_key().unwrap();
        let private = dir.path().join("id_ed25519");
        app.save_generated_key(&private.display().to_string(), "")
            .unwrap();
        assert!(private.exists());
        assert!(dir.path().join("id_ed25519.pub").exists());
    }

    #[tokio::test]
    async fn test_draw_main_screen() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        app.add_connection("alpha.example", "me", "").unwrap();
        app.add_snippet("disk", "df -h", "").unwrap();
        let (_id, _server) = attach(&mut app, "alpha.example");
        app.views[0].output.push_str("hello\n");
        app.open_prompt(PromptKind::NewConnection);

        let backend = ratatui::backend::TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| crate::ui::draw(f, &app)).unwrap();

        app.screen = Screen::KeyGen;
        app.prompt = None;
        terminal.draw(|f| crate::ui::draw(f, &app)).unwrap();
    }
}
