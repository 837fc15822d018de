use anyhow::Result;
use citizen_registry::{
    gender_index, parse_dob, Advisory, AdvisoryLevel, AuthAttempt, AuthStatus, BusinessInsights,
    Citizen, CitizenProfile, CitizenTable, DeduplicationConflict, Demographics, Enrollment,
    NewCitizen, Registry, RegistryError, AADHAAR_ID_MAX_LEN, GENDER_OPTIONS,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use tracing::error;

const TIMESTAMP_DISPLAY: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_DOB: &str = "1990-01-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Enrollment,
    Authentication,
    Reporting,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Enrollment => Page::Authentication,
            Page::Authentication => Page::Reporting,
            Page::Reporting => Page::Enrollment,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Enrollment => Page::Reporting,
            Page::Authentication => Page::Enrollment,
            Page::Reporting => Page::Authentication,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Enrollment => "Enrollment Management",
            Page::Authentication => "Authentication & Verification",
            Page::Reporting => "Reporting & Analytics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn next(&self) -> Self {
        match self {
            Operation::Create => Operation::Read,
            Operation::Read => Operation::Update,
            Operation::Update => Operation::Delete,
            Operation::Delete => Operation::Create,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Operation::Create => Operation::Delete,
            Operation::Read => Operation::Create,
            Operation::Update => Operation::Read,
            Operation::Delete => Operation::Update,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Operation::Create => "Create",
            Operation::Read => "Read",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTable {
    Citizens,
    AuthLog,
    Conflicts,
}

impl ReportTable {
    fn index(&self) -> usize {
        match self {
            ReportTable::Citizens => 0,
            ReportTable::AuthLog => 1,
            ReportTable::Conflicts => 2,
        }
    }

    fn next(&self) -> Self {
        match self {
            ReportTable::Citizens => ReportTable::AuthLog,
            ReportTable::AuthLog => ReportTable::Conflicts,
            ReportTable::Conflicts => ReportTable::Citizens,
        }
    }

    fn previous(&self) -> Self {
        match self {
            ReportTable::Citizens => ReportTable::Conflicts,
            ReportTable::AuthLog => ReportTable::Citizens,
            ReportTable::Conflicts => ReportTable::AuthLog,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

impl Banner {
    fn new(kind: BannerKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn color(&self) -> Color {
        match self.kind {
            BannerKind::Success => Color::Green,
            BannerKind::Error => Color::Red,
            BannerKind::Warning => Color::Yellow,
            BannerKind::Info => Color::Cyan,
        }
    }

    fn icon(&self) -> &'static str {
        match self.kind {
            BannerKind::Success => "✅",
            BannerKind::Error => "❌",
            BannerKind::Warning => "⚠️",
            BannerKind::Info => "ℹ️",
        }
    }
}

// ============================================================================
// FORMS
// ============================================================================

#[derive(Debug, Clone)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    pub max_len: Option<usize>,
    pub options: Option<&'static [&'static str]>,
}

impl Field {
    fn text(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            max_len: None,
            options: None,
        }
    }

    fn limited(label: &'static str, max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::text(label)
        }
    }

    fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    fn choice(label: &'static str, options: &'static [&'static str], selected: usize) -> Self {
        Self {
            label,
            value: options[selected.min(options.len() - 1)].to_string(),
            max_len: None,
            options: Some(options),
        }
    }

    fn push(&mut self, c: char) {
        if self.options.is_some() {
            return;
        }
        if let Some(max) = self.max_len {
            if self.value.chars().count() >= max {
                return;
            }
        }
        self.value.push(c);
    }

    fn pop(&mut self) {
        if self.options.is_none() {
            self.value.pop();
        }
    }

    fn cycle(&mut self, forward: bool) {
        let Some(options) = self.options else {
            return;
        };
        let current = options.iter().position(|o| *o == self.value).unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else {
            (current + options.len() - 1) % options.len()
        };
        self.value = options[next].to_string();
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Form {
    fn new(fields: Vec<Field>) -> Self {
        Self { fields, focus: 0 }
    }

    fn value(&self, i: usize) -> &str {
        self.fields.get(i).map(|f| f.value.as_str()).unwrap_or("")
    }

    fn focused_mut(&mut self) -> Option<&mut Field> {
        self.fields.get_mut(self.focus)
    }

    fn next_field(&mut self) {
        if self.focus + 1 < self.fields.len() {
            self.focus += 1;
        }
    }

    fn previous_field(&mut self) {
        self.focus = self.focus.saturating_sub(1);
    }

    /// Route a text-editing key to the focused field
    fn edit(&mut self, key: KeyEvent) {
        let Some(field) = self.focused_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => field.push(c),
            KeyCode::Backspace => field.pop(),
            KeyCode::Left => field.cycle(false),
            KeyCode::Right => field.cycle(true),
            _ => {}
        }
    }
}

fn create_form() -> Form {
    Form::new(vec![
        Field::limited("Aadhaar ID (12 digits)", AADHAAR_ID_MAX_LEN),
        Field::text("Full Name"),
        Field::limited("Date of Birth (YYYY-MM-DD)", 10).with_value(DEFAULT_DOB),
        Field::choice("Gender", &GENDER_OPTIONS, 0),
        Field::text("Address"),
        Field::text("Simulated Biometric ID (Hash)"),
    ])
}

fn lookup_form(label: &'static str) -> Form {
    Form::new(vec![Field::limited(label, AADHAAR_ID_MAX_LEN)])
}

fn update_form(citizen: &Citizen) -> Form {
    let dob = citizen
        .dob
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| DEFAULT_DOB.to_string());

    Form::new(vec![
        Field::text("New Name").with_value(citizen.name.clone()),
        Field::limited("New Date of Birth (YYYY-MM-DD)", 10).with_value(dob),
        Field::choice("New Gender", &GENDER_OPTIONS, gender_index(&citizen.gender)),
        Field::text("New Address").with_value(citizen.address.clone()),
    ])
}

fn auth_form() -> Form {
    Form::new(vec![
        Field::limited("Aadhaar ID", AADHAAR_ID_MAX_LEN),
        Field::text("Simulated Biometric ID"),
    ])
}

fn form_for(operation: Operation) -> Form {
    match operation {
        Operation::Create => create_form(),
        Operation::Read => lookup_form("Enter Aadhaar ID to read"),
        Operation::Update => lookup_form("Enter Aadhaar ID to update"),
        Operation::Delete => lookup_form("Enter Aadhaar ID to delete"),
    }
}

// ============================================================================
// APP
// ============================================================================

pub struct App {
    registry: Registry,
    alert_threshold: i64,
    pub current_page: Page,

    // Enrollment Management
    pub operation: Operation,
    pub selector_focused: bool,
    pub enroll_form: Form,
    pub update_target: Option<String>,
    pub read_result: Option<Citizen>,

    // Authentication & Verification
    pub auth_form: Form,
    pub ekyc: Option<CitizenProfile>,

    // Reporting & Analytics (re-read after every key press)
    pub insights: Option<BusinessInsights>,
    pub advisories: Vec<Advisory>,
    pub citizens: CitizenTable,
    pub auth_log: Vec<AuthAttempt>,
    pub conflicts: Vec<DeduplicationConflict>,
    pub report_focus: ReportTable,
    pub report_states: [TableState; 3],

    pub banner: Option<Banner>,

    /// Last refresh failure; shown with the alerts, never over `banner`
    pub load_error: Option<String>,
}

impl App {
    pub fn new(registry: Registry, alert_threshold: i64) -> Self {
        let mut app = Self {
            registry,
            alert_threshold,
            current_page: Page::Enrollment,
            operation: Operation::Create,
            selector_focused: true,
            enroll_form: create_form(),
            update_target: None,
            read_result: None,
            auth_form: auth_form(),
            ekyc: None,
            insights: None,
            advisories: Vec::new(),
            citizens: CitizenTable {
                columns: Vec::new(),
                rows: Vec::new(),
            },
            auth_log: Vec::new(),
            conflicts: Vec::new(),
            report_focus: ReportTable::Citizens,
            report_states: Default::default(),
            banner: None,
            load_error: None,
        };
        app.refresh();
        app
    }

    /// Re-derive every displayed figure from the store
    pub fn refresh(&mut self) {
        self.load_error = match self.load_dashboard() {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "dashboard refresh failed");
                Some(format!("Could not load dashboard data: {e}"))
            }
        };
    }

    fn load_dashboard(&mut self) -> citizen_registry::Result<()> {
        let insights = self.registry.get_business_insights()?;
        self.advisories = insights.advisories(self.alert_threshold);
        self.insights = Some(insights);

        self.citizens = self.registry.read_all_citizens()?;
        self.auth_log = self.registry.auth_log()?;
        self.conflicts = self.registry.deduplication_conflicts()?;

        let lens = [self.citizens.rows.len(), self.auth_log.len(), self.conflicts.len()];
        for (state, len) in self.report_states.iter_mut().zip(lens) {
            clamp_selection(state, len);
        }
        Ok(())
    }

    /// Handle one key press. Returns false when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return true;
        }

        match key.code {
            KeyCode::Esc => return false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => self.previous_page(),
            KeyCode::Tab => self.next_page(),
            KeyCode::BackTab => self.previous_page(),
            _ => match self.current_page {
                Page::Enrollment => self.handle_enrollment_key(key),
                Page::Authentication => self.handle_authentication_key(key),
                Page::Reporting => self.handle_reporting_key(key),
            },
        }

        self.refresh();
        true
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.banner = None;
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.banner = None;
    }

    pub fn set_operation(&mut self, operation: Operation) {
        self.operation = operation;
        self.enroll_form = form_for(operation);
        self.update_target = None;
        self.read_result = None;
        self.banner = None;
    }

    // ========================================================================
    // Enrollment Management
    // ========================================================================

    fn handle_enrollment_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_enrollment(),
            KeyCode::Up if !self.selector_focused => {
                if self.enroll_form.focus == 0 {
                    self.selector_focused = true;
                } else {
                    self.enroll_form.previous_field();
                }
            }
            KeyCode::Down => {
                if self.selector_focused {
                    self.selector_focused = false;
                } else {
                    self.enroll_form.next_field();
                }
            }
            KeyCode::Left if self.selector_focused => self.set_operation(self.operation.previous()),
            KeyCode::Right if self.selector_focused => self.set_operation(self.operation.next()),
            _ if !self.selector_focused => self.enroll_form.edit(key),
            _ => {}
        }
    }

    fn submit_enrollment(&mut self) {
        match self.operation {
            Operation::Create => self.submit_create(),
            Operation::Read => self.submit_read(),
            Operation::Update => self.submit_update(),
            Operation::Delete => self.submit_delete(),
        }
    }

    fn submit_create(&mut self) {
        let form = &self.enroll_form;
        let aadhaar_id = form.value(0).trim().to_string();
        if aadhaar_id.is_empty() {
            self.banner = Some(Banner::new(BannerKind::Error, "Aadhaar ID is required."));
            return;
        }
        let Some(dob) = parse_dob(form.value(2)) else {
            self.banner = Some(Banner::new(BannerKind::Error, "Date of Birth must be YYYY-MM-DD."));
            return;
        };

        let new = NewCitizen {
            aadhaar_id,
            name: form.value(1).to_string(),
            dob,
            gender: form.value(3).to_string(),
            address: form.value(4).to_string(),
            biometric_hash: form.value(5).to_string(),
        };

        self.banner = Some(match self.registry.enroll(&new) {
            Ok(Enrollment::Enrolled(_)) => {
                self.enroll_form = create_form();
                Banner::new(BannerKind::Success, "Enrollment successful!")
            }
            Ok(Enrollment::Duplicate) => Banner::new(
                BannerKind::Error,
                "De-duplication check failed: Biometric ID already exists!",
            ),
            Err(e) => Banner::new(BannerKind::Error, e.to_string()),
        });
    }

    fn submit_read(&mut self) {
        let aadhaar_id = self.enroll_form.value(0).trim().to_string();
        match self.registry.read_citizen(&aadhaar_id) {
            Ok(Some(citizen)) => {
                self.read_result = Some(citizen);
                self.banner = None;
            }
            Ok(None) => {
                self.read_result = None;
                self.banner = Some(Banner::new(
                    BannerKind::Warning,
                    "No record found for this Aadhaar ID.",
                ));
            }
            Err(e) => self.banner = Some(Banner::new(BannerKind::Error, e.to_string())),
        }
    }

    /// First submit looks the record up and loads the edit form; the second
    /// writes the edited demographics back.
    fn submit_update(&mut self) {
        let Some(target) = self.update_target.clone() else {
            let aadhaar_id = self.enroll_form.value(0).trim().to_string();
            match self.registry.read_citizen(&aadhaar_id) {
                Ok(Some(citizen)) => {
                    self.enroll_form = update_form(&citizen);
                    self.update_target = Some(aadhaar_id);
                    self.banner = Some(Banner::new(
                        BannerKind::Info,
                        format!("Editing {}", citizen.aadhaar_id),
                    ));
                }
                Ok(None) => {
                    self.banner = Some(Banner::new(BannerKind::Warning, "Aadhaar ID not found."));
                }
                Err(e) => self.banner = Some(Banner::new(BannerKind::Error, e.to_string())),
            }
            return;
        };

        let form = &self.enroll_form;
        let Some(dob) = parse_dob(form.value(1)) else {
            self.banner = Some(Banner::new(BannerKind::Error, "Date of Birth must be YYYY-MM-DD."));
            return;
        };
        let demographics = Demographics {
            name: form.value(0).to_string(),
            dob,
            gender: form.value(2).to_string(),
            address: form.value(3).to_string(),
        };

        self.banner = Some(match self.registry.update_citizen(&target, &demographics) {
            Ok(()) => Banner::new(BannerKind::Success, "Citizen record updated successfully!"),
            Err(RegistryError::NotFound(_)) => {
                self.set_operation(Operation::Update);
                Banner::new(BannerKind::Warning, "Aadhaar ID not found.")
            }
            Err(e) => Banner::new(BannerKind::Error, e.to_string()),
        });
    }

    fn submit_delete(&mut self) {
        let aadhaar_id = self.enroll_form.value(0).trim().to_string();
        self.banner = Some(match self.registry.delete_citizen(&aadhaar_id) {
            Ok(true) => Banner::new(BannerKind::Success, "Citizen record deleted successfully."),
            Ok(false) => Banner::new(BannerKind::Warning, "No record found for this Aadhaar ID."),
            Err(e) => Banner::new(BannerKind::Error, format!("Error deleting record: {e}")),
        });
    }

    // ========================================================================
    // Authentication & Verification
    // ========================================================================

    fn handle_authentication_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_authentication(),
            KeyCode::Up => self.auth_form.previous_field(),
            KeyCode::Down => self.auth_form.next_field(),
            _ => self.auth_form.edit(key),
        }
    }

    fn submit_authentication(&mut self) {
        let aadhaar_id = self.auth_form.value(0).trim().to_string();
        let marker = self.auth_form.value(1).to_string();

        match self.registry.authenticate(&aadhaar_id, &marker) {
            Ok(true) => {
                self.banner = Some(Banner::new(BannerKind::Success, "Authentication Successful!"));
                self.ekyc = match self.registry.read_citizen(&aadhaar_id) {
                    Ok(citizen) => citizen.map(|c| c.profile()),
                    Err(e) => {
                        self.banner = Some(Banner::new(BannerKind::Error, e.to_string()));
                        None
                    }
                };
            }
            Ok(false) => {
                self.ekyc = None;
                self.banner = Some(Banner::new(
                    BannerKind::Error,
                    "Authentication Failed. Biometric or Aadhaar ID is incorrect.",
                ));
            }
            Err(e) => {
                self.ekyc = None;
                self.banner = Some(Banner::new(BannerKind::Error, e.to_string()));
            }
        }
    }

    // ========================================================================
    // Reporting & Analytics
    // ========================================================================

    fn table_len(&self, table: ReportTable) -> usize {
        match table {
            ReportTable::Citizens => self.citizens.rows.len(),
            ReportTable::AuthLog => self.auth_log.len(),
            ReportTable::Conflicts => self.conflicts.len(),
        }
    }

    fn handle_reporting_key(&mut self, key: KeyEvent) {
        let len = self.table_len(self.report_focus);
        let state = &mut self.report_states[self.report_focus.index()];

        match key.code {
            KeyCode::Left => self.report_focus = self.report_focus.previous(),
            KeyCode::Right => self.report_focus = self.report_focus.next(),
            KeyCode::Down | KeyCode::Char('j') => move_selection(state, len, 1),
            KeyCode::Up | KeyCode::Char('k') => move_selection(state, len, -1),
            KeyCode::PageDown => move_selection(state, len, 20),
            KeyCode::PageUp => move_selection(state, len, -20),
            KeyCode::Home if len > 0 => state.select(Some(0)),
            KeyCode::End if len > 0 => state.select(Some(len - 1)),
            _ => {}
        }
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        None => state.select(Some(0)),
        _ => {}
    }
}

/// Move by `delta` rows, wrapping only on single steps
fn move_selection(state: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let last = len as isize - 1;
    let next = match delta {
        1 if current >= last => 0,
        -1 if current == 0 => last,
        _ => (current + delta).clamp(0, last),
    };
    state.select(Some(next as usize));
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "terminal loop failed");
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let alert_lines = app.advisories.len() + usize::from(app.load_error.is_some());
    let advisory_height = if alert_lines == 0 {
        0
    } else {
        alert_lines as u16 + 2
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),               // Header with navigation + metrics
            Constraint::Length(advisory_height), // Advisories
            Constraint::Min(0),                  // Content area
            Constraint::Length(3),               // Result banner
            Constraint::Length(3),               // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    if advisory_height > 0 {
        render_advisories(f, chunks[1], app);
    }

    match app.current_page {
        Page::Enrollment => render_enrollment(f, chunks[2], app),
        Page::Authentication => render_authentication(f, chunks[2], app),
        Page::Reporting => render_reporting(f, chunks[2], app),
    }

    render_banner(f, chunks[3], app);
    render_status_bar(f, chunks[4], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Enrollment, Page::Authentication, Page::Reporting];

    let mut tab_spans = vec![Span::styled(
        "🛡️ Aadhaar Management System  ",
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let metric_spans = match &app.insights {
        Some(insights) => vec![
            Span::styled(
                format!("Enrolled: {}", insights.total_enrolled),
                Style::default().fg(Color::White),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("Auth attempts: {}", insights.total_auth_attempts),
                Style::default().fg(Color::White),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("Successful: {}", insights.successful_auths),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("Failed: {}", insights.failed_auths),
                Style::default().fg(Color::Red),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("De-dup conflicts: {}", insights.dedup_conflicts),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("Avg age: {}", insights.avg_age_display()),
                Style::default().fg(Color::Cyan),
            ),
        ],
        None => vec![Span::styled("Metrics unavailable", Style::default().fg(Color::DarkGray))],
    };

    let header = Paragraph::new(vec![Line::from(tab_spans), Line::from(metric_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_advisories(f: &mut Frame, area: Rect, app: &App) {
    let load_error = app.load_error.iter().map(|msg| {
        Line::from(vec![
            Span::raw("❌ "),
            Span::styled(msg.clone(), Style::default().fg(Color::Red)),
        ])
    });

    let lines: Vec<Line> = load_error
        .chain(app.advisories.iter().map(|advisory| {
            let (icon, color) = match advisory.level {
                AdvisoryLevel::Warning => ("⚠️ ", Color::Yellow),
                AdvisoryLevel::Info => ("ℹ️ ", Color::Cyan),
            };
            Line::from(vec![
                Span::raw(icon),
                Span::styled(advisory.message, Style::default().fg(color)),
            ])
        }))
        .collect();

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Alerts "),
    );
    f.render_widget(paragraph, area);
}

fn render_form(f: &mut Frame, area: Rect, title: &str, form: &Form, focused: bool, header: Vec<Line>) {
    let mut lines = header;

    for (i, field) in form.fields.iter().enumerate() {
        let active = focused && i == form.focus;
        let marker = if active {
            Span::styled("→ ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            Span::raw("  ")
        };

        let value = match field.options {
            Some(_) => format!("◀ {} ▶", field.value),
            None if active => format!("{}▏", field.value),
            None => field.value.clone(),
        };

        lines.push(Line::from(vec![
            marker,
            Span::styled(
                format!("{}: ", field.label),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                value,
                if active {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::White)
                },
            ),
        ]));
        lines.push(Line::from(""));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", title)),
    );
    f.render_widget(paragraph, area);
}

fn field_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("  {}: ", label),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(value),
    ])
}

fn profile_lines(profile: &CitizenProfile) -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        field_line("Aadhaar ID", profile.aadhaar_id.clone()),
        field_line("Name", profile.name.clone()),
        field_line("Date of Birth", profile.dob.map(|d| d.to_string()).unwrap_or_default()),
        field_line("Gender", profile.gender.clone()),
        field_line("Address", profile.address.clone()),
        field_line(
            "Enrollment Date",
            profile.enrollment_date.format(TIMESTAMP_DISPLAY).to_string(),
        ),
    ]
}

fn render_enrollment(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let mut selector = vec![Span::raw(if app.selector_focused { "→ " } else { "  " })];
    selector.push(Span::styled(
        "Operation: ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    for op in Operation::ALL {
        let style = if op == app.operation {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        selector.push(Span::styled(op.title().to_string(), style));
        selector.push(Span::raw("  "));
    }

    let subtitle = match (app.operation, &app.update_target) {
        (Operation::Create, _) => "Create New Enrollment".to_string(),
        (Operation::Read, _) => "Read Citizen Record".to_string(),
        (Operation::Update, None) => "Update Citizen Record".to_string(),
        (Operation::Update, Some(id)) => format!("Update Citizen Record - {}", id),
        (Operation::Delete, _) => "Delete Citizen Record".to_string(),
    };

    render_form(
        f,
        chunks[0],
        &subtitle,
        &app.enroll_form,
        !app.selector_focused,
        vec![Line::from(selector), Line::from("")],
    );

    let detail = match (&app.operation, &app.read_result) {
        (Operation::Read, Some(citizen)) => profile_lines(&citizen.profile()),
        _ => vec![
            Line::from(""),
            Line::from(Span::styled(
                "  ←/→ on the operation row switches Create/Read/Update/Delete",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
            Line::from(Span::styled(
                "  ←/→ on Gender cycles the choices",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
            Line::from(Span::styled(
                "  Enter submits",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ],
    };

    let panel = Paragraph::new(detail).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Citizen Record "),
    );
    f.render_widget(panel, chunks[1]);
}

fn render_authentication(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_form(f, chunks[0], "Authenticate", &app.auth_form, true, vec![Line::from("")]);

    let content = match &app.ekyc {
        Some(profile) => profile_lines(profile),
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Demographic data appears here after a successful authentication",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ],
    };

    let panel = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" eKYC Data Retrieval "),
    );
    f.render_widget(panel, chunks[1]);
}

fn header_row(titles: &[String]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(h.clone()).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn report_block(title: &'static str, focused: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::White }))
        .title(title)
}

fn render_reporting(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
        ])
        .split(area);

    let highlight = Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);

    // Enrollment History
    let focused = app.report_focus == ReportTable::Citizens;
    if app.citizens.rows.is_empty() {
        let empty = Paragraph::new("  No citizens enrolled yet.")
            .block(report_block(" Enrollment History ", focused));
        f.render_widget(empty, chunks[0]);
    } else {
        let rows = app.citizens.rows.iter().map(|c| {
            Row::new(vec![
                Cell::from(c.aadhaar_id.clone()),
                Cell::from(truncate(&c.name, 24)),
                Cell::from(c.dob.map(|d| d.to_string()).unwrap_or_default()),
                Cell::from(c.gender.clone()),
                Cell::from(truncate(&c.address, 30)),
                Cell::from(truncate(&c.biometric_hash, 20)),
                Cell::from(c.enrollment_date.format(TIMESTAMP_DISPLAY).to_string()),
            ])
            .height(1)
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(14),
                Constraint::Length(26),
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Length(32),
                Constraint::Length(22),
                Constraint::Length(20),
            ],
        )
        .header(header_row(&app.citizens.columns))
        .block(report_block(" Enrollment History ", focused))
        .highlight_style(highlight)
        .highlight_symbol("→ ");

        f.render_stateful_widget(table, chunks[0], &mut app.report_states[0]);
    }

    // Authentication Log
    let rows = app.auth_log.iter().map(|a| {
        let color = match a.status {
            AuthStatus::Success => Color::Green,
            AuthStatus::Failed => Color::Red,
        };
        Row::new(vec![
            Cell::from(a.log_id.to_string()),
            Cell::from(a.aadhaar_id.clone().unwrap_or_else(|| "-".to_string())),
            Cell::from(a.attempt_date.format(TIMESTAMP_DISPLAY).to_string()),
            Cell::from(a.status.as_str()).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Length(20),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&columns(&["log_id", "aadhaar_id", "attempt_date", "status"])))
    .block(report_block(" Authentication Log ", app.report_focus == ReportTable::AuthLog))
    .highlight_style(highlight)
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[1], &mut app.report_states[1]);

    // De-duplication Conflicts
    let rows = app.conflicts.iter().map(|c| {
        Row::new(vec![
            Cell::from(c.conflict_id.to_string()),
            Cell::from(truncate(&c.biometric_hash, 40)),
            Cell::from(c.attempt_date.format(TIMESTAMP_DISPLAY).to_string()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(42),
            Constraint::Length(20),
        ],
    )
    .header(header_row(&columns(&["conflict_id", "biometric_hash", "attempt_date"])))
    .block(report_block(" De-duplication Conflicts ", app.report_focus == ReportTable::Conflicts))
    .highlight_style(highlight)
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[2], &mut app.report_states[2]);
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn render_banner(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.banner {
        Some(banner) => Line::from(vec![
            Span::raw(format!(" {} ", banner.icon())),
            Span::styled(
                banner.text.clone(),
                Style::default().fg(banner.color()).add_modifier(Modifier::BOLD),
            ),
        ]),
        None => Line::from(""),
    };

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![
        Span::styled(
            format!(" {} ", app.current_page.title()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Section | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
    ];

    if app.current_page == Page::Reporting {
        status_spans.push(Span::raw(" Rows | "));
        status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Table | "));
        status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Fast | "));
    } else {
        status_spans.push(Span::raw(" Field | "));
        status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Submit | "));
    }

    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
