//! CLI command dispatch

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Password};

use iserve_protocol::api::{Credentials, StatisticsQuery, UserUpdateRequest};
use iserve_protocol::common::{Demand, DemandPatch, ResponsePatch, ServiceResponse};

use crate::attachment::{AttachmentScope, AttachmentService, LatestFile};
use crate::client::HttpClient;
use crate::config::{default_config_path, CliConfig};
use crate::error::{IserveError, Result};
use crate::session::SessionStore;
use crate::statistics::StatisticsService;
use crate::store::{DemandStore, NewDemand, NewResponse};
use crate::ui::{create_progress_bar, format_size_colored, UI};
use crate::upload::progress_channel;
use crate::utils::{
    file_category, format_bytes, format_local_time, parse_iso_time, relative_time,
};
use crate::{
    Commands, ConfigCommand, DemandCommand, FileCommand, LoginArgs, ProfileArgs, RegisterArgs,
    ResponseCommand, StatsCommand,
};

/// CLI handler for processing commands
pub struct CliHandler {
    config: CliConfig,
    config_path: Option<PathBuf>,
    client: HttpClient,
    session: SessionStore,
    store: DemandStore,
    ui: UI,
}

impl CliHandler {
    /// Create a handler, loading configuration and opening the local stores
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = CliConfig::load(config_path.as_deref()).await?;
        let client_config = config.to_client_config();
        let client = HttpClient::new(client_config.clone())?;
        let session = SessionStore::open(&client_config.storage);
        let store = DemandStore::open(&client_config.storage);

        Ok(Self {
            config,
            config_path,
            client,
            session,
            store,
            ui: UI::new(),
        })
    }

    /// Execute a CLI command
    ///
    /// An expired session is the one globally fatal condition: whatever
    /// command triggered it, the user is pointed back to login.
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        let result = self.dispatch(command).await;

        if let Err(err) = &result {
            if err.is_session_expired() {
                self.ui
                    .error("Your session has expired; run `iserve login` to sign in again.");
            }
        }

        result
    }

    async fn dispatch(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout(),
            Commands::Register(args) => self.handle_register(args).await,
            Commands::Whoami => self.handle_whoami(),
            Commands::Profile(args) => self.handle_profile(args).await,
            Commands::Demand(args) => self.handle_demand(args.command).await,
            Commands::Response(args) => self.handle_response(args.command).await,
            Commands::File(args) => self.handle_file(args.command).await,
            Commands::Stats(args) => self.handle_stats(args.command).await,
            Commands::Config(args) => self.handle_config(args.command).await,
        }
    }

    fn current_user_id(&self) -> Result<String> {
        if !self.session.is_logged_in() {
            return Err(IserveError::session_not_found(
                "Please run `iserve login` first",
            ));
        }

        let info = self.session.user_info();
        Ok(info.id.clone().unwrap_or_else(|| info.username.clone()))
    }

    // ---- Session --------------------------------------------------------

    async fn handle_login(&mut self, args: LoginArgs) -> Result<()> {
        let username = match args.username {
            Some(username) => username,
            None => Input::<String>::new().with_prompt("Username").interact_text()?,
        };
        let password = Password::new().with_prompt("Password").interact()?;

        let credentials = Credentials { username, password };

        if self.session.login(&self.client, &credentials).await {
            self.ui.success(&format!(
                "Logged in as {}",
                self.session.user_info().username
            ));
            Ok(())
        } else {
            let message = self
                .session
                .last_error()
                .unwrap_or("Login failed")
                .to_string();
            self.ui.error(&message);
            Err(IserveError::authentication(message))
        }
    }

    fn handle_logout(&mut self) -> Result<()> {
        self.session.logout();
        self.ui.success("Logged out");
        Ok(())
    }

    async fn handle_register(&mut self, args: RegisterArgs) -> Result<()> {
        let username = match args.username {
            Some(username) => username,
            None => Input::<String>::new().with_prompt("Username").interact_text()?,
        };
        let password = Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?;

        let request = Credentials { username, password };

        let registered = if args.admin {
            self.session.register_admin(&self.client, &request).await
        } else {
            self.session.register(&self.client, &request).await
        };

        if registered {
            self.ui.success(&format!(
                "Registered and logged in as {}",
                self.session.user_info().username
            ));
            Ok(())
        } else {
            let message = self
                .session
                .last_error()
                .unwrap_or("Registration failed")
                .to_string();
            self.ui.error(&message);
            Err(IserveError::authentication(message))
        }
    }

    fn handle_whoami(&mut self) -> Result<()> {
        let session_status = self.ui.format_session_status(self.session.is_logged_in());

        let mut rows = vec![("Session", session_status)];

        if self.session.is_logged_in() {
            let info = self.session.user_info();
            rows.push(("Username", self.ui.format_user_field(Some(&info.username))));
            rows.push(("User id", self.ui.format_user_field(info.id.as_deref())));
            rows.push(("Email", self.ui.format_user_field(info.email.as_deref())));
            rows.push(("Phone", self.ui.format_user_field(info.phone.as_deref())));
        }

        rows.push(("Server", self.config.endpoint.clone()));

        self.ui.card("Session", rows);
        Ok(())
    }

    async fn handle_profile(&mut self, args: ProfileArgs) -> Result<()> {
        let patch = UserUpdateRequest {
            real_name: args.real_name,
            phone: args.phone,
            biography: args.biography,
            email: args.email,
            avatar: args.avatar,
        };

        if patch.real_name.is_none()
            && patch.phone.is_none()
            && patch.biography.is_none()
            && patch.email.is_none()
            && patch.avatar.is_none()
        {
            return Err(IserveError::invalid_input("Nothing to update"));
        }

        if self.session.update_user_info(&self.client, &patch).await {
            self.ui.success("Profile updated");
            Ok(())
        } else {
            let message = self
                .session
                .last_error()
                .unwrap_or("Profile update failed")
                .to_string();
            self.ui.error(&message);
            Err(IserveError::invalid_input(message))
        }
    }

    // ---- Demands --------------------------------------------------------

    async fn handle_demand(&mut self, command: DemandCommand) -> Result<()> {
        match command {
            DemandCommand::List {
                service_type,
                mine,
                search,
                page,
                page_size,
            } => {
                let user_filter = if mine {
                    Some(self.current_user_id()?)
                } else {
                    None
                };

                self.store.filter_by_user(user_filter);
                self.store.filter_by_type(service_type);
                self.store.search(search.as_deref().unwrap_or(""));
                self.store.set_page(page, page_size);

                if self.store.page().is_empty() {
                    self.ui.warning("No demands match the current filters");
                    return Ok(());
                }

                let rows: Vec<Demand> = self.store.page().to_vec();
                for demand in &rows {
                    self.print_demand_row(demand);
                }

                let pagination = self.store.pagination();
                let pages = pagination.total.div_ceil(pagination.page_size).max(1);
                self.ui.info(&format!(
                    "Page {}/{} ({} matching)",
                    pagination.current, pages, pagination.total
                ));
                Ok(())
            }

            DemandCommand::Show { id } => match self.store.get_by_id(&id) {
                Some(demand) => {
                    self.print_demand_card(&demand);
                    Ok(())
                }
                None => {
                    self.ui.warning(&format!("Demand {} not found", id));
                    Ok(())
                }
            },

            DemandCommand::Create {
                service_type,
                title,
                description,
                address,
            } => {
                let user_id = self.current_user_id()?;
                let demand = self.store.create(NewDemand {
                    user_id,
                    service_type,
                    title,
                    description,
                    address,
                });
                self.ui
                    .success(&format!("Created demand {} ({})", demand.id, demand.title));
                Ok(())
            }

            DemandCommand::Update {
                id,
                service_type,
                title,
                description,
                address,
                status,
            } => {
                let patch = DemandPatch {
                    service_type,
                    title,
                    description,
                    address,
                    status,
                };

                if patch.service_type.is_none()
                    && patch.title.is_none()
                    && patch.description.is_none()
                    && patch.address.is_none()
                    && patch.status.is_none()
                {
                    return Err(IserveError::invalid_input("Nothing to update"));
                }

                match self.store.update(&id, &patch) {
                    Some(updated) => {
                        self.ui
                            .success(&format!("Updated demand {} ({})", updated.id, updated.status));
                        Ok(())
                    }
                    None => {
                        self.ui.warning(&format!("Demand {} not found", id));
                        Ok(())
                    }
                }
            }

            DemandCommand::Delete { id, force } => {
                if !force {
                    let confirmed = Confirm::new()
                        .with_prompt(format!("Delete demand {}?", id))
                        .default(false)
                        .interact()?;
                    if !confirmed {
                        self.ui.info("Cancelled");
                        return Ok(());
                    }
                }

                if self.store.delete(&id) {
                    self.ui.success(&format!("Deleted demand {}", id));
                } else {
                    self.ui.warning(&format!("Demand {} not found", id));
                }
                Ok(())
            }
        }
    }

    fn print_demand_row(&self, demand: &Demand) {
        self.ui.line(&format!(
            "{:<5} {:<15} {:<12} {:<42} {}",
            demand.id,
            demand.service_type,
            demand.status,
            demand.title,
            format_local_time(&demand.update_time)
        ));
    }

    fn print_demand_card(&self, demand: &Demand) {
        self.ui.card(
            &format!("Demand {}", demand.id),
            vec![
                ("Title", demand.title.clone()),
                ("Type", demand.service_type.to_string()),
                ("Status", demand.status.to_string()),
                ("Address", demand.address.clone()),
                ("Posted by", demand.user_id.clone()),
                ("Created", format_local_time(&demand.create_time)),
                (
                    "Updated",
                    format!(
                        "{} ({})",
                        format_local_time(&demand.update_time),
                        relative_time(&demand.update_time, chrono::Utc::now())
                    ),
                ),
                ("Description", demand.description.clone()),
            ],
        );
    }

    // ---- Responses ------------------------------------------------------

    async fn handle_response(&mut self, command: ResponseCommand) -> Result<()> {
        match command {
            ResponseCommand::List { user } => {
                let user_id = match user {
                    Some(user) => user,
                    None => self.current_user_id()?,
                };

                let responses = self.store.list_my_responses(&user_id);
                if responses.is_empty() {
                    self.ui
                        .warning(&format!("No responses submitted by {}", user_id));
                    return Ok(());
                }

                for response in &responses {
                    self.print_response_row(response);
                }
                Ok(())
            }

            ResponseCommand::Create { demand_id, content } => {
                let user_id = self.current_user_id()?;

                if self.store.get_by_id(&demand_id).is_none() {
                    self.ui.warning(&format!("Demand {} not found", demand_id));
                    return Ok(());
                }

                let response = self.store.create_response(NewResponse {
                    demand_id,
                    user_id,
                    content,
                });
                self.ui.success(&format!(
                    "Created response {} to \"{}\"",
                    response.id,
                    response.demand_title.as_deref().unwrap_or("unknown demand")
                ));
                Ok(())
            }

            ResponseCommand::Update { id, content, status } => {
                let patch = ResponsePatch { content, status };

                if patch.content.is_none() && patch.status.is_none() {
                    return Err(IserveError::invalid_input("Nothing to update"));
                }

                match self.store.update_response(&id, &patch) {
                    Some(updated) => {
                        self.ui.success(&format!(
                            "Updated response {} ({})",
                            updated.id, updated.status
                        ));
                        Ok(())
                    }
                    None => {
                        self.ui.warning(&format!("Response {} not found", id));
                        Ok(())
                    }
                }
            }

            ResponseCommand::Delete { id, force } => {
                if !force {
                    let confirmed = Confirm::new()
                        .with_prompt(format!("Delete response {}?", id))
                        .default(false)
                        .interact()?;
                    if !confirmed {
                        self.ui.info("Cancelled");
                        return Ok(());
                    }
                }

                if self.store.delete_response(&id) {
                    self.ui.success(&format!("Deleted response {}", id));
                } else {
                    self.ui.warning(&format!("Response {} not found", id));
                }
                Ok(())
            }
        }
    }

    fn print_response_row(&self, response: &ServiceResponse) {
        let demand_title = response.demand_title.as_deref().unwrap_or("unknown demand");
        let demand_status = response
            .demand_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        self.ui.line(&format!(
            "{:<5} {:<15} {:<32} [{}] {}",
            response.id, response.status, demand_title, demand_status, response.content
        ));
    }

    // ---- Attachments ----------------------------------------------------

    async fn handle_file(&mut self, command: FileCommand) -> Result<()> {
        match command {
            FileCommand::Upload { scope, id, path } => {
                let uploaded = self.transfer(scope, &id, &path, false).await?;
                self.ui.success(&format!(
                    "Uploaded {} ({}) to {} {}",
                    uploaded.original_name,
                    format_size_colored(uploaded.size_bytes),
                    scope,
                    id
                ));
                Ok(())
            }

            FileCommand::Replace { scope, id, path } => {
                let uploaded = self.transfer(scope, &id, &path, true).await?;
                self.ui.success(&format!(
                    "Replaced attachment of {} {} with {} ({})",
                    scope,
                    id,
                    uploaded.original_name,
                    format_size_colored(uploaded.size_bytes)
                ));
                Ok(())
            }

            FileCommand::Get {
                scope,
                id,
                download,
                output,
            } => {
                let service = AttachmentService::new(&self.client, scope);

                match service.get_latest(&id, download).await? {
                    None => {
                        self.ui
                            .warning(&format!("No attachment found for {} {}", scope, id));
                        Ok(())
                    }
                    Some(LatestFile::Descriptor(descriptor)) => {
                        let content_type = descriptor.content_type.as_deref().unwrap_or("");
                        self.ui.card(
                            &format!("Attachment of {} {}", scope, id),
                            vec![
                                ("Filename", descriptor.filename.clone()),
                                ("Size", format_bytes(descriptor.size)),
                                (
                                    "Type",
                                    if content_type.is_empty() {
                                        "unknown".to_string()
                                    } else {
                                        content_type.to_string()
                                    },
                                ),
                                (
                                    "Category",
                                    file_category(&descriptor.filename, content_type)
                                        .as_str()
                                        .to_string(),
                                ),
                                ("Download", descriptor.url.clone()),
                            ],
                        );
                        Ok(())
                    }
                    Some(LatestFile::Content { filename, bytes, .. }) => {
                        let target = output.unwrap_or_else(|| PathBuf::from(&filename));
                        tokio::fs::write(&target, &bytes)
                            .await
                            .map_err(|e| IserveError::io_from_error("Attachment write", e))?;
                        self.ui.success(&format!(
                            "Saved {} ({})",
                            target.display(),
                            format_bytes(bytes.len() as u64)
                        ));
                        Ok(())
                    }
                }
            }
        }
    }

    async fn transfer(
        &self,
        scope: AttachmentScope,
        id: &str,
        path: &std::path::Path,
        replace: bool,
    ) -> Result<iserve_protocol::common::UploadedFile> {
        let service = AttachmentService::new(&self.client, scope);

        let (tx, mut rx) = progress_channel();
        let bar = create_progress_bar(if replace { "Replacing" } else { "Uploading" });
        let bar_updater = bar.clone();
        let watcher = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                bar_updater.set_position(*rx.borrow() as u64);
            }
        });

        let result = if replace {
            service.replace(id, path, Some(tx)).await
        } else {
            service.upload(id, path, Some(tx)).await
        };

        let _ = watcher.await;
        bar.finish_and_clear();

        result
    }

    // ---- Statistics -----------------------------------------------------

    async fn handle_stats(&mut self, command: StatsCommand) -> Result<()> {
        match command {
            StatsCommand::Monthly {
                responded,
                locations,
                service_type_ids,
                from,
                to,
            } => {
                let parse_bound = |raw: Option<String>, name: &str| match raw {
                    None => Ok(None),
                    Some(raw) => parse_iso_time(&raw).map(Some).ok_or_else(|| {
                        IserveError::invalid_input(format!("Invalid {} time: {}", name, raw))
                    }),
                };

                let query = StatisticsQuery {
                    match_location_ids: locations,
                    match_service_type_ids: service_type_ids,
                    earliest_create_time: parse_bound(from, "from")?,
                    latest_create_time: parse_bound(to, "to")?,
                };

                let service = StatisticsService::new(&self.client);
                let counts = if responded {
                    service.monthly_responded(&query).await?
                } else {
                    service.monthly_creation(&query).await?
                };

                if counts.is_empty() {
                    self.ui.warning("No statistics for the given filters");
                    return Ok(());
                }

                let label = if responded { "responded" } else { "created" };
                self.ui.info(&format!("Monthly demands {}", label));
                for count in counts {
                    self.ui.line(&format!("{:<9} {}", count.month, count.count));
                }
                Ok(())
            }

            StatsCommand::Overview => {
                let overview = self.store.monthly_overview();
                if overview.is_empty() {
                    self.ui.warning("The local dataset is empty");
                    return Ok(());
                }

                self.ui
                    .line(&format!("{:<9} {:>8} {:>10}", "month", "demands", "responses"));
                for row in overview {
                    self.ui.line(&format!(
                        "{:<9} {:>8} {:>10}",
                        row.month, row.demand_count, row.response_count
                    ));
                }
                Ok(())
            }
        }
    }

    // ---- Configuration --------------------------------------------------

    async fn handle_config(&mut self, command: ConfigCommand) -> Result<()> {
        let path = self
            .config_path
            .clone()
            .unwrap_or_else(default_config_path);

        match command {
            ConfigCommand::Show => {
                self.ui.card(
                    "Configuration",
                    vec![
                        ("Endpoint", self.config.endpoint.clone()),
                        ("Timeout", format!("{}s", self.config.timeout)),
                        ("Verbose", self.config.verbose.to_string()),
                        (
                            "Storage",
                            self.config.storage_dir.to_string_lossy().to_string(),
                        ),
                    ],
                );
                Ok(())
            }

            ConfigCommand::SetEndpoint { url } => {
                self.config.endpoint = url;
                self.config.save(&path).await?;
                self.ui
                    .success(&format!("Endpoint set to {}", self.config.endpoint));
                Ok(())
            }

            ConfigCommand::SetTimeout { seconds } => {
                self.config.timeout = seconds;
                self.config.save(&path).await?;
                self.ui.success(&format!("Timeout set to {}s", seconds));
                Ok(())
            }

            ConfigCommand::Reset => {
                self.config = CliConfig::default();
                self.config.save(&path).await?;
                self.ui.success("Configuration reset to defaults");
                Ok(())
            }
        }
    }
}
