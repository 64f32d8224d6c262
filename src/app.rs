use color_eyre::Result;
use crossterm::style::Stylize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{Collection, QueryCache, QueryKey, QuerySnapshot};
use crate::commands::{self, Action, Fields, COMMANDS};
use crate::config::Config;
use crate::coordinator::WorkOrderMutations;
use crate::event::EventBus;
use crate::render;
use crate::service::{
  HttpService, InMemoryService, NewWorkOrder, ServiceHandle, WorkOrderId, WorkOrderUpdate,
};
use crate::view::{today_local, DashboardView, Derived, FilterState};

/// Where the work order service lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
  /// In-process service, lost on exit
  Memory,
  /// HTTP service at this base URL
  Http(String),
  /// Nothing configured; every call fails as unavailable
  Unconfigured,
}

impl Backend {
  pub fn from_config(config: &Config, memory: bool) -> Self {
    if memory {
      return Backend::Memory;
    }
    match &config.service.url {
      Some(url) => Backend::Http(url.clone()),
      None => Backend::Unconfigured,
    }
  }
}

/// Main application state
pub struct App {
  backend: Backend,

  /// Shared service slot, filled once a connection succeeds
  handle: ServiceHandle,

  cache: QueryCache,

  mutations: WorkOrderMutations,

  /// Dashboard filter controls
  filter: FilterState,

  /// Memoized dashboard derivation
  view: DashboardView,

  /// Background connection attempt, if one was started
  connecting: Option<JoinHandle<()>>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, backend: Backend) -> Self {
    let handle = ServiceHandle::new();
    let events = EventBus::new();
    let cache = QueryCache::new(handle.clone(), config.stale_after());
    events.subscribe(Arc::new(cache.clone()));
    let mutations = WorkOrderMutations::new(handle.clone(), events);

    Self {
      backend,
      handle,
      cache,
      mutations,
      filter: FilterState::default(),
      view: DashboardView::new(),
      connecting: None,
      should_quit: false,
    }
  }

  /// Establish the service handle.
  ///
  /// The in-process service is ready immediately; the HTTP service is
  /// checked in the background so the shell is usable while it connects.
  pub fn connect(&mut self) {
    if self.handle.is_ready() {
      return;
    }
    if let Some(task) = &self.connecting {
      if !task.is_finished() {
        return;
      }
    }

    match &self.backend {
      Backend::Memory => {
        info!("using in-memory work order service");
        self.handle.establish(Arc::new(InMemoryService::new()));
      }
      Backend::Http(url) => {
        let url = url.clone();
        let handle = self.handle.clone();
        self.connecting = Some(tokio::spawn(async move {
          match HttpService::connect(&url).await {
            Ok(service) => {
              info!(url = %service.base_url(), "connected to work order service");
              handle.establish(Arc::new(service));
            }
            Err(e) => warn!(error = %e, "failed to connect to work order service"),
          }
        }));
      }
      Backend::Unconfigured => {
        warn!("no work order service configured");
      }
    }
  }

  pub async fn run(&mut self, seed: bool) -> Result<()> {
    self.connect();
    self.load_initial_data(seed);

    let mut out = std::io::stdout();
    writeln!(out, "{}", "wo: work order tracker. Type 'help' for commands.".bold())?;
    if self.backend == Backend::Unconfigured {
      writeln!(
        out,
        "{}",
        "No service configured. Use --url, WO_SERVICE_URL or --memory.".yellow()
      )?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !self.should_quit {
      write!(out, "wo> ")?;
      out.flush()?;

      let line = tokio::select! {
        line = lines.next_line() => line?,
        _ = tokio::signal::ctrl_c() => None,
      };
      let Some(line) = line else {
        break;
      };

      let mut buf = Vec::new();
      self.execute(&line, &mut buf).await?;
      out.write_all(&buf)?;
    }

    info!("shell exited");
    Ok(())
  }

  /// Once the service is ready, optionally seed it and load the dashboard
  fn load_initial_data(&self, seed: bool) {
    let handle = self.handle.clone();
    let cache = self.cache.clone();
    let seeder = self.mutations.seed.clone();

    tokio::spawn(async move {
      handle.wait_ready().await;
      if seed {
        // Runs on its own task so `mutations` can show it as pending
        match seeder.mutate(()).await {
          Ok(Err(e)) => warn!(error = %e, "startup seed failed"),
          Err(e) => warn!(error = %e, "startup seed task failed"),
          Ok(Ok(_)) => {}
        }
      }
      if let Err(e) = cache.fetch(&QueryKey::All).await {
        warn!(error = %e, "initial load failed");
      }
    });
  }

  /// Run one shell line, writing its output to `out`
  pub async fn execute(&mut self, line: &str, out: &mut impl Write) -> Result<()> {
    let action = match commands::parse(line) {
      Ok(Some(action)) => action,
      Ok(None) => return Ok(()),
      Err(e) => {
        writeln!(out, "{}", e.to_string().red())?;
        return Ok(());
      }
    };

    match action {
      Action::List => self.show_dashboard(out).await?,
      Action::FilterStatus(status) => {
        self.filter.status = status;
        self.show_dashboard(out).await?;
      }
      Action::FilterWorker(worker) => {
        self.filter.worker = worker;
        self.show_dashboard(out).await?;
      }
      Action::Search(text) => {
        self.filter.search = text;
        self.show_dashboard(out).await?;
      }
      Action::Clear => {
        self.filter.clear();
        self.show_dashboard(out).await?;
      }
      Action::Workers => {
        let derived = self.derive().await;
        if derived.workers.is_empty() {
          writeln!(out, "{}", "No workers".dark_grey())?;
        }
        for worker in &derived.workers {
          writeln!(out, "{}", worker)?;
        }
      }
      Action::Stats => {
        let derived = self.derive().await;
        writeln!(out, "{}", render::stats_line(&derived.stats))?;
        let overdue = derived.overdue_count(today_local());
        if overdue > 0 {
          writeln!(out, "{}", format!("{} shown overdue", overdue).red())?;
        }
      }
      Action::RemoteStatus(status) => self.show_remote(QueryKey::ByStatus(status), out).await?,
      Action::RemoteWorker(worker) => self.show_remote(QueryKey::ByWorker(worker), out).await?,
      Action::Show(id) => {
        let result = match self.handle.service() {
          Ok(service) => service.get(id).await,
          Err(e) => Err(e),
        };
        match result {
          Ok(order) => write!(out, "{}", render::order_detail(&order, today_local()))?,
          Err(e) => writeln!(out, "{}", e.to_string().red())?,
        }
      }
      Action::Create(fields) => self.create(fields, out).await?,
      Action::Update(id, fields) => self.update(id, fields, out).await?,
      Action::Delete(id) => match self.mutations.delete.mutate_async(id).await {
        Ok(()) => writeln!(out, "{}", format!("Deleted work order #{}", id).green())?,
        Err(e) => writeln!(out, "{}", format!("Failed to delete: {}", e).red())?,
      },
      Action::Seed if self.mutations.seed.is_pending() => {
        writeln!(out, "Seeding already in progress")?;
      }
      Action::Seed => match self.mutations.seed.mutate_async(()).await {
        Ok(0) => writeln!(out, "Service already has work orders")?,
        Ok(n) => writeln!(out, "{}", format!("Seeded {} work orders", n).green())?,
        Err(e) => writeln!(out, "{}", format!("Failed to seed: {}", e).red())?,
      },
      Action::Refresh => {
        if let Err(e) = self.cache.refetch(&QueryKey::All).await {
          writeln!(out, "{}", format!("Refresh failed: {}", e).red())?;
        }
        self.show_dashboard(out).await?;
      }
      Action::Cache => write!(out, "{}", render::cache_table(&self.cache.snapshots()))?,
      Action::Mutations => {
        writeln!(out, "{}", render::mutation_line(&self.mutations.create))?;
        writeln!(out, "{}", render::mutation_line(&self.mutations.update))?;
        writeln!(out, "{}", render::mutation_line(&self.mutations.delete))?;
        writeln!(out, "{}", render::mutation_line(&self.mutations.seed))?;
      }
      Action::ResetMutations => {
        self.mutations.reset();
        writeln!(out, "Mutation states reset")?;
      }
      Action::Connect => {
        if self.handle.is_ready() {
          writeln!(out, "Already connected")?;
        } else {
          self.connect();
          let message = if self.handle.is_ready() {
            "Connected"
          } else if self.backend == Backend::Unconfigured {
            "No service configured"
          } else {
            "Connecting..."
          };
          writeln!(out, "{}", message)?;
        }
      }
      Action::Help => {
        for cmd in COMMANDS {
          writeln!(out, "  {:<14} {}", cmd.name.bold(), cmd.description)?;
          writeln!(out, "  {:<14} {}", "", cmd.usage.dark_grey())?;
        }
      }
      Action::Quit => self.should_quit = true,
    }
    Ok(())
  }

  /// Derived dashboard state, waiting for the first load if one is running
  async fn derive(&mut self) -> Arc<Derived> {
    let snapshot = self.current_snapshot().await;
    self.view.derive(snapshot.data.as_ref(), &self.filter)
  }

  /// The dashboard entry. Expired data is shown while it refreshes, but
  /// missing or invalidated data is waited for.
  async fn current_snapshot(&self) -> QuerySnapshot<Collection> {
    let snapshot = self.cache.read(&QueryKey::All);
    if snapshot.fetching && (snapshot.data.is_none() || snapshot.invalidated) {
      // A failure is recorded on the entry and rendered from there
      let _ = self.cache.fetch(&QueryKey::All).await;
      return self.cache.read(&QueryKey::All);
    }
    snapshot
  }

  async fn show_dashboard(&mut self, out: &mut impl Write) -> Result<()> {
    let snapshot = self.current_snapshot().await;
    let derived = self.view.derive(snapshot.data.as_ref(), &self.filter);
    debug!(
      visible = derived.visible.len(),
      computations = self.view.computations(),
      "dashboard derived"
    );
    write!(
      out,
      "{}",
      render::dashboard(&snapshot, &derived, &self.filter, today_local())
    )?;
    Ok(())
  }

  async fn show_remote(&self, key: QueryKey, out: &mut impl Write) -> Result<()> {
    if let Err(e) = self.cache.fetch(&key).await {
      writeln!(out, "{}", e.to_string().red())?;
      return Ok(());
    }
    let snapshot = self.cache.read(&key);
    write!(out, "{}", render::remote_list(&key, &snapshot, today_local()))?;
    Ok(())
  }

  async fn create(&self, mut fields: Fields, out: &mut impl Write) -> Result<()> {
    let missing = missing_fields(&fields, &["customer", "phone", "worker", "date", "due"]);
    if !missing.is_empty() {
      writeln!(
        out,
        "{}",
        format!("Missing required fields: {}", missing.join(", ")).red()
      )?;
      return Ok(());
    }

    let mut take = |key: &str| fields.remove(key).unwrap_or_default().trim().to_string();
    let customer = take("customer");
    let phone = take("phone");
    let order = NewWorkOrder {
      customer_name: format!("{} | {}", customer, phone),
      worker_name: take("worker"),
      date_of_work: take("date"),
      due_date: take("due"),
    };

    match self.mutations.create.mutate_async(order).await {
      Ok(id) => writeln!(out, "{}", format!("Created work order #{}", id).green())?,
      Err(e) => writeln!(out, "{}", format!("Failed to create: {}", e).red())?,
    }
    Ok(())
  }

  async fn update(&self, id: WorkOrderId, fields: Fields, out: &mut impl Write) -> Result<()> {
    let current = match self.handle.service() {
      Ok(service) => service.get(id).await,
      Err(e) => Err(e),
    };
    let current = match current {
      Ok(order) => order,
      Err(e) => {
        writeln!(out, "{}", format!("Failed to update: {}", e).red())?;
        return Ok(());
      }
    };

    let mut update = WorkOrderUpdate::from_order(&current);
    for (key, value) in fields {
      let value = value.trim().to_string();
      match key.as_str() {
        "status" => update.status = value.as_str().into(),
        "notes" => update.notes = value,
        "customer" => update.customer_name = value,
        "worker" => update.worker_name = value,
        "date" => update.date_of_work = value,
        "due" => update.due_date = value,
        _ => {}
      }
    }

    let mut empty = Vec::new();
    for (name, value) in [
      ("status", update.status.as_str()),
      ("customer", update.customer_name.as_str()),
      ("worker", update.worker_name.as_str()),
      ("date", update.date_of_work.as_str()),
      ("due", update.due_date.as_str()),
    ] {
      if value.is_empty() {
        empty.push(name);
      }
    }
    if !empty.is_empty() {
      writeln!(
        out,
        "{}",
        format!("Fields cannot be empty: {}", empty.join(", ")).red()
      )?;
      return Ok(());
    }

    match self.mutations.update.mutate_async((id, update)).await {
      Ok(()) => writeln!(out, "{}", format!("Updated work order #{}", id).green())?,
      Err(e) => writeln!(out, "{}", format!("Failed to update: {}", e).red())?,
    }
    Ok(())
  }
}

/// Required fields that are absent or blank
fn missing_fields(fields: &Fields, required: &[&'static str]) -> Vec<&'static str> {
  required
    .iter()
    .copied()
    .filter(|key| fields.get(*key).is_none_or(|v| v.trim().is_empty()))
    .collect()
}
