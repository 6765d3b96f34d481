use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Local, NaiveDate, Timelike, Utc};
use crossterm::{event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Terminal, text::{Line, Span}, widgets::{Block, Borders, List, ListItem, Paragraph, ListState, Wrap}, layout::{Layout, Constraint, Direction}, style::{Style, Modifier, Color}};

use hamlet::{
    application::{
        calendar::{day_schedule, CalendarView, NavAction, RequiredTask, RequiredTasks},
        countdowns::{CountdownBoard, CountdownLine},
        sky::{CancelFlag, SkyService},
        task_service::TaskService,
        tick::Ticker,
        timer::{StartOutcome, TimerSession, TimerSnapshot},
        village::{can_track_time, local_now, Building, CalendarPanel, Dashboard, StatusFilter},
    },
    config::AppConfig,
    domain::{
        dates::{self, MonthCell, DAY_NAMES},
        repository::{TaskRepository, TimeEntryRepository},
        task::{Category, ClockTime, NewTask, Task, TaskId, TaskStatus},
        time_entry::format_clock,
        weather::{SkyState, TimeOfDay, WeatherKind},
    },
    infrastructure::{local_storage::FileStorage, open_meteo::OpenMeteoClient, sqlite_repo::SqliteStore, unconfigured::UnconfiguredStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    match config.database_url.clone() {
        Some(database_url) => {
            let store = SqliteStore::connect(&database_url).await?;
            run(config, store.tasks(), store.time_entries()).await
        }
        None => run(config, UnconfiguredStore, UnconfiguredStore).await,
    }
}

async fn run<T: TaskRepository, E: TimeEntryRepository>(config: AppConfig, tasks: T, entries: E) -> Result<()> {
    tasks.init().await?;
    entries.init().await?;

    let sky = SkyService::new(Local::now().hour());
    let cancel = CancelFlag::default();
    let weather = tokio::spawn({
        let (sky, cancel) = (sky.clone(), cancel.clone());
        let client = OpenMeteoClient::new(config.weather_url.clone());
        let coordinates = config.coordinates;
        async move {
            sky.fetch_weather(&client, coordinates, Local::now().hour(), &cancel).await;
        }
    });
    let clock = Ticker::spawn(Duration::from_secs(60), {
        let sky = sky.clone();
        move || {
            let sky = sky.clone();
            async move {
                sky.refresh_time_of_day(Local::now().hour()).await;
            }
        }
    });

    let mut app = App {
        tasks: TaskService::new(tasks),
        timer: TimerSession::new(entries),
        countdowns: CountdownBoard::load(FileStorage::new(config.data_dir.clone())),
        sky,
        view: CalendarView::new(dates::today()),
        pane: Pane::Day,
        filter: StatusFilter::All,
        list_state: ListState::default(),
        mode: Mode::View,
        draft: String::new(),
        draft_category: Category::Goal,
        status: String::new(),
        last_tick: Instant::now(),
    };
    app.load().await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    cancel.cancel();
    weather.abort();
    clock.stop();
    res
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode { View, NewTask, NewCountdown, RemoveCountdown }

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pane { Day, Building(Building) }

struct App<T: TaskRepository, E: TimeEntryRepository> {
    tasks: TaskService<T>,
    timer: TimerSession<E>,
    countdowns: CountdownBoard<FileStorage>,
    sky: SkyService,
    view: CalendarView,
    pane: Pane,
    filter: StatusFilter,
    list_state: ListState,
    mode: Mode,
    draft: String,
    draft_category: Category,
    status: String,
    last_tick: Instant,
}

/// What one frame draws, gathered before entering the sync draw closure.
struct Screen {
    dashboard: Dashboard,
    items: Vec<Task>,
    all_tasks: Vec<Task>,
    timer: TimerSnapshot,
    sky: SkyState,
    configured: bool,
}

impl<T: TaskRepository, E: TimeEntryRepository> App<T, E> {
    async fn load(&mut self) {
        if let Err(err) = self.tasks.refresh().await {
            self.status = err.to_string();
        } else if !self.tasks.is_configured() {
            self.status = "store unconfigured: set DATABASE_URL to save tasks".to_string();
        }
        if let Err(err) = self.timer.resume().await {
            self.status = err.to_string();
        }
        if let Err(err) = self.timer.refresh_entries().await {
            self.status = err.to_string();
        }
    }

    fn visible(&self, tasks: &[Task]) -> Vec<Task> {
        match self.pane {
            Pane::Day => day_schedule(tasks, self.view.viewing_date),
            Pane::Building(building) => self.filter.apply(&building.tasks(tasks)),
        }
    }

    async fn selected(&self) -> Option<Task> {
        let items = self.visible(&self.tasks.cached().await);
        self.list_state.selected().and_then(|i| items.get(i).cloned())
    }

    async fn screen(&mut self) -> Screen {
        let all_tasks = self.tasks.cached().await;
        let today = dates::today();
        let items = self.visible(&all_tasks);
        let selected = match (items.len(), self.list_state.selected()) {
            (0, _) => None,
            (len, Some(i)) if i >= len => Some(len - 1),
            (_, None) => Some(0),
            (_, current) => current,
        };
        self.list_state.select(selected);
        Screen {
            dashboard: Dashboard::build(&all_tasks, &self.view, today, self.countdowns.render(local_now())),
            items,
            timer: self.timer.snapshot_at(Utc::now()).await,
            sky: self.sky.state().await,
            configured: self.tasks.is_configured(),
            all_tasks,
        }
    }

    fn navigate(&mut self, action: NavAction) {
        self.view.apply(action, dates::today());
        self.list_state.select(None);
    }

    fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 { return }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        self.list_state.select(Some((current + delta).clamp(0, len as isize - 1) as usize));
    }

    async fn advance_selected(&mut self) {
        let Some(task) = self.selected().await else { return };
        self.status = match self.tasks.advance(task.id).await {
            Ok(task) => format!("\"{}\" is now {}", task.title, status_label(task.status)),
            Err(err) => err.to_string(),
        };
    }

    async fn delete_selected(&mut self) {
        let Some(task) = self.selected().await else { return };
        self.status = match self.tasks.delete(task.id).await {
            Ok(()) if self.timer.release_task(task.id).await => format!("removed \"{}\" and its running timer", task.title),
            Ok(()) => format!("removed \"{}\"", task.title),
            Err(err) => err.to_string(),
        };
    }

    async fn toggle_timer(&mut self) {
        if self.timer.state().await.active_task().is_some() {
            self.status = match self.timer.stop().await {
                Ok(Some(entry)) => format!("logged {}", format_clock(entry.duration_seconds.unwrap_or(0))),
                Ok(None) => String::new(),
                Err(err) => err.to_string(),
            };
            return;
        }
        let Some(task) = self.selected().await else { return };
        if !can_track_time(&task) {
            self.status = "only open university study sessions can be timed".to_string();
            return;
        }
        self.status = match self.timer.start(task.id).await {
            Ok(StartOutcome::Started(_)) => format!("timing \"{}\"", task.title),
            Ok(StartOutcome::AlreadyRunning { .. }) => "a timer is already running".to_string(),
            Err(err) => err.to_string(),
        };
        if let Err(err) = self.timer.refresh_entries().await {
            self.status = err.to_string();
        }
    }

    async fn submit_task(&mut self) {
        let (title, subcategory) = split_tag(&self.draft);
        let input = NewTask {
            category: Some(self.draft_category),
            subcategory,
            scheduled_date: Some(self.view.viewing_date),
            ..NewTask::titled(title)
        };
        self.status = match self.tasks.create(input).await {
            Ok(task) => format!("posted \"{}\" to the {}", task.title, Building::for_category(task.category).name()),
            Err(err) => err.to_string(),
        };
    }

    fn submit_countdown(&mut self) {
        let mut parts = self.draft.split('|').map(str::trim);
        let title = parts.next().unwrap_or_default().to_string();
        let date = parts.next().filter(|s| !s.is_empty()).map(dates::parse_date_key);
        let time = parts.next().filter(|s| !s.is_empty()).map(str::parse::<ClockTime>);
        self.status = match (date.transpose(), time.transpose()) {
            (Err(err), _) => err.to_string(),
            (_, Err(err)) => err.to_string(),
            (Ok(date), Ok(time)) => match self.countdowns.add(&title, date, time.map(|t| t.0)) {
                Ok(countdown) => format!("counting down to {}", countdown.title),
                Err(err) => err.to_string(),
            },
        };
    }

    fn remove_countdown(&mut self) {
        let picked = self.draft.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1)).and_then(|i| self.countdowns.entries().get(i).cloned());
        self.status = match picked {
            Some(countdown) => match self.countdowns.remove(&countdown.id) {
                Ok(()) => format!("removed {}", countdown.title),
                Err(err) => err.to_string(),
            },
            None => "no countdown with that number".to_string(),
        };
    }
}

/// `"Revise chapter 3 #study"` → title plus subcategory tag.
fn split_tag(draft: &str) -> (String, Option<String>) {
    match draft.rsplit_once(" #") {
        Some((title, tag)) if !tag.trim().is_empty() && !tag.contains(' ') => (title.trim().to_string(), Some(tag.trim().to_string())),
        _ => (draft.trim().to_string(), None),
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status { TaskStatus::Todo => "Awaiting", TaskStatus::InProgress => "In Battle", TaskStatus::Done => "Conquered" }
}

fn status_mark(status: TaskStatus) -> &'static str {
    match status { TaskStatus::Todo => "[ ]", TaskStatus::InProgress => "[~]", TaskStatus::Done => "[x]" }
}

fn category_color(category: Category) -> Color {
    match category { Category::University => Color::Blue, Category::Work => Color::Yellow, Category::Social => Color::Magenta, Category::Goal => Color::Green }
}

fn task_item(task: &Task, active: Option<TaskId>) -> ListItem<'static> {
    let time = match (task.scheduled_start, task.scheduled_end) {
        (Some(start), Some(end)) => format!("{start}-{end} "),
        (Some(start), None) => format!("{start} "),
        _ => String::new(),
    };
    let mut spans = vec![
        Span::raw(format!("{} ", status_mark(task.status))),
        Span::styled(time, Style::default().fg(Color::DarkGray)),
        Span::styled(task.title.clone(), Style::default().fg(category_color(task.category))),
    ];
    if let Some(tag) = &task.subcategory { spans.push(Span::styled(format!(" #{tag}"), Style::default().fg(Color::DarkGray))); }
    if let Some(days) = &task.repeat_days { spans.push(Span::styled(format!(" ({})", days.label()), Style::default().fg(Color::DarkGray))); }
    if active == Some(task.id) { spans.push(Span::styled(" ⏱", Style::default().fg(Color::Red))); }
    ListItem::new(Line::from(spans))
}

fn calendar_lines(panel: &CalendarPanel, viewing: NaiveDate) -> Vec<Line<'static>> {
    match panel {
        CalendarPanel::Week { days } => days
            .iter()
            .flat_map(|bucket| {
                let style = if bucket.date == viewing { Style::default().add_modifier(Modifier::REVERSED) }
                    else if bucket.is_today { Style::default().add_modifier(Modifier::BOLD) }
                    else { Style::default() };
                let mut lines = vec![Line::from(Span::styled(format!("{} {}", bucket.label, dates::short_date(bucket.date)), style))];
                lines.extend(bucket.tasks.iter().map(|t| Line::from(Span::styled(format!("  {} {}", status_mark(t.status), t.title), Style::default().fg(category_color(t.category))))));
                lines
            })
            .collect(),
        CalendarPanel::Month(month) => {
            let mut lines = vec![Line::from(DAY_NAMES.iter().map(|d| format!("{:<5}", &d[..2])).collect::<String>())];
            for week in month.cells.chunks(7) {
                let spans = week.iter().map(|cell| match cell {
                    MonthCell::Blank => Span::raw("     "),
                    MonthCell::Day { day, date, is_today } => {
                        let marker = month.markers.get(date).map(|m| {
                            let mut s = String::new();
                            if m.class { s.push('c') }
                            if m.test { s.push('t') }
                            if m.work { s.push('w') }
                            if m.social { s.push('s') }
                            s
                        }).unwrap_or_default();
                        let style = if *date == viewing { Style::default().add_modifier(Modifier::REVERSED) }
                            else if *is_today { Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan) }
                            else { Style::default() };
                        Span::styled(format!("{:>2}{:<3}", day, marker.chars().take(3).collect::<String>()), style)
                    }
                }).collect::<Vec<_>>();
                lines.push(Line::from(spans));
            }
            lines.push(Line::from(Span::styled("c class  t test  w work  s social", Style::default().fg(Color::DarkGray))));
            lines
        }
    }
}

fn required_lines(required: &RequiredTasks) -> Vec<Line<'static>> {
    if required.is_empty() { return vec![Line::from("Nothing due. Enjoy the village.")] }
    let line = |entry: &RequiredTask| {
        let due = entry.task.scheduled_date.map(dates::short_date).unwrap_or_else(|| "someday".to_string());
        let style = if entry.overdue { Style::default().fg(Color::Red) } else { Style::default() };
        Line::from(vec![Span::styled(format!("{due:>8} "), style), Span::raw(entry.task.title.clone())])
    };
    let mut lines = vec![Line::from(Span::styled("Goals", Style::default().add_modifier(Modifier::BOLD)))];
    lines.extend(required.goals.iter().map(line));
    if !required.others.is_empty() {
        lines.push(Line::from(Span::styled("Pinned", Style::default().add_modifier(Modifier::BOLD))));
        lines.extend(required.others.iter().map(line));
    }
    lines
}

fn countdown_lines(countdowns: &[CountdownLine]) -> Vec<Line<'static>> {
    if countdowns.is_empty() { return vec![Line::from("No countdowns (c to add)")] }
    countdowns
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let style = if line.arrived { Style::default().fg(Color::Green) } else { Style::default() };
            Line::from(vec![Span::raw(format!("{}. {} ", i + 1, line.countdown.title)), Span::styled(line.remaining.clone(), style)])
        })
        .collect()
}

fn sky_label(sky: &SkyState) -> String {
    let time = match sky.time_of_day { TimeOfDay::Night => "Night", TimeOfDay::Dawn => "Dawn", TimeOfDay::Morning => "Morning", TimeOfDay::Day => "Day", TimeOfDay::Evening => "Evening", TimeOfDay::Dusk => "Dusk" };
    let mut label = time.to_string();
    if sky.weather_known {
        let weather = match sky.weather { WeatherKind::Clear => "clear", WeatherKind::Clouds => "cloudy", WeatherKind::Fog => "foggy", WeatherKind::Rain => "rain", WeatherKind::Snow => "snow", WeatherKind::Storm => "storm" };
        label.push_str(&format!(", {weather}"));
    }
    if let Some(temp) = sky.temperature { label.push_str(&format!(", {temp:.0}°C")); }
    if sky.show_stars { label.push_str(" ✦"); }
    label
}

async fn run_app<T: TaskRepository, E: TimeEntryRepository>(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App<T, E>) -> Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        let screen = app.screen().await;
        let len = screen.items.len();
        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3), Constraint::Length(3)])
                .split(f.size());

            let store = if screen.configured { "" } else { "  |  store unconfigured" };
            let header = Paragraph::new(format!("{} {}  |  {}{}", dates::weekday_label(screen.dashboard.today), dates::short_date(screen.dashboard.today), sky_label(&screen.sky), store))
                .block(Block::default().borders(Borders::ALL).title("hamlet"));
            f.render_widget(header, chunks[0]);

            let middle = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(35), Constraint::Percentage(35), Constraint::Percentage(30)])
                .split(chunks[1]);

            let list_title = match app.pane {
                Pane::Day => format!("{} schedule", screen.dashboard.day.label),
                Pane::Building(building) => format!("{} · {} [{}]", building.name(), building.subtitle(), app.filter.label()),
            };
            let list = List::new(screen.items.iter().map(|t| task_item(t, screen.timer.active_task_id)).collect::<Vec<_>>())
                .block(Block::default().borders(Borders::ALL).title(list_title))
                .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
                .highlight_symbol(">> ");
            f.render_stateful_widget(list, middle[0], &mut app.list_state);

            let calendar = Paragraph::new(calendar_lines(&screen.dashboard.calendar, screen.dashboard.view.viewing_date))
                .block(Block::default().borders(Borders::ALL).title(screen.dashboard.calendar_title.clone()));
            f.render_widget(calendar, middle[1]);

            let side = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(middle[2]);
            f.render_widget(Paragraph::new(required_lines(&screen.dashboard.required)).wrap(Wrap { trim: true }).block(Block::default().borders(Borders::ALL).title("Required")), side[0]);
            f.render_widget(Paragraph::new(countdown_lines(&screen.dashboard.countdowns)).block(Block::default().borders(Borders::ALL).title("Countdowns")), side[1]);

            let timer_text = match screen.timer.active_task_id {
                Some(id) => {
                    let title = screen.all_tasks.iter().find(|t| t.id == id).map(|t| t.title.as_str()).unwrap_or("(unknown task)");
                    format!("⏱ {}  {}  |  today {}", title, format_clock(screen.timer.elapsed_seconds), format_clock(screen.timer.today_total_seconds))
                }
                None => format!("timer idle  |  today {}", format_clock(screen.timer.today_total_seconds)),
            };
            f.render_widget(Paragraph::new(timer_text).block(Block::default().borders(Borders::ALL).title("timer")), chunks[2]);

            let footer_text = match app.mode {
                Mode::View if !app.status.is_empty() => app.status.clone(),
                Mode::View => "←/→ prev/next  h/l day  t today  m week/month  1-4 building  0 day  f filter  Enter advance  s timer  n new  d delete  c/x countdown  q quit".to_string(),
                Mode::NewTask => format!("New {} task: {}_  (Tab category, \" #tag\" subcategory, Enter save, Esc cancel)", app.draft_category.as_str(), app.draft),
                Mode::NewCountdown => format!("Countdown: {}_  (title | YYYY-MM-DD | HH:MM)", app.draft),
                Mode::RemoveCountdown => format!("Remove countdown number: {}_", app.draft),
            };
            f.render_widget(Paragraph::new(footer_text).block(Block::default().borders(Borders::ALL).title("info")), chunks[3]);
        })?;

        let timeout = tick_rate.saturating_sub(app.last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind != KeyEventKind::Press { continue; }
                match app.mode {
                    Mode::View => {
                        app.status.clear();
                        match key.code {
                            KeyCode::Char('q') => break,
                            KeyCode::Left => app.navigate(NavAction::Previous),
                            KeyCode::Right => app.navigate(NavAction::Next),
                            KeyCode::Char('h') => app.navigate(NavAction::PrevDay),
                            KeyCode::Char('l') => app.navigate(NavAction::NextDay),
                            KeyCode::Char('t') => app.navigate(NavAction::Today),
                            KeyCode::Char('m') => app.navigate(NavAction::ToggleMode),
                            KeyCode::Up => app.move_selection(-1, len),
                            KeyCode::Down => app.move_selection(1, len),
                            KeyCode::Enter => app.advance_selected().await,
                            KeyCode::Char('s') => app.toggle_timer().await,
                            KeyCode::Char('d') => app.delete_selected().await,
                            KeyCode::Char('f') => { app.filter = app.filter.cycle(); app.list_state.select(None); }
                            KeyCode::Char('r') => app.load().await,
                            KeyCode::Char('0') => { app.pane = Pane::Day; app.list_state.select(None); }
                            KeyCode::Char(c @ '1'..='4') => {
                                app.pane = Pane::Building(Building::ALL[c as usize - '1' as usize]);
                                app.list_state.select(None);
                            }
                            KeyCode::Char('n') => {
                                app.mode = Mode::NewTask;
                                app.draft.clear();
                                app.draft_category = match app.pane { Pane::Building(building) => building.category(), Pane::Day => Category::Goal };
                            }
                            KeyCode::Char('c') => { app.mode = Mode::NewCountdown; app.draft.clear(); }
                            KeyCode::Char('x') => { app.mode = Mode::RemoveCountdown; app.draft.clear(); }
                            _ => {}
                        }
                    }
                    Mode::NewTask | Mode::NewCountdown | Mode::RemoveCountdown => match key.code {
                        KeyCode::Esc => { app.mode = Mode::View; app.draft.clear(); }
                        KeyCode::Enter => {
                            match app.mode {
                                Mode::NewTask => app.submit_task().await,
                                Mode::NewCountdown => app.submit_countdown(),
                                _ => app.remove_countdown(),
                            }
                            app.mode = Mode::View;
                            app.draft.clear();
                        }
                        KeyCode::Tab if app.mode == Mode::NewTask => {
                            let next = Category::ALL.iter().position(|c| *c == app.draft_category).map_or(0, |i| (i + 1) % Category::ALL.len());
                            app.draft_category = Category::ALL[next];
                        }
                        KeyCode::Backspace => { app.draft.pop(); }
                        KeyCode::Char(c) => app.draft.push(c),
                        _ => {}
                    },
                }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}
