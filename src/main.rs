//! Seira CLI - manage Kubernetes as a PaaS on GKE, Cloud SQL and Helm

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use seira::commands::{self, cluster, config, db, jobs, memcached, node_pools, pods, proxy, redis, secrets, setup};
use seira::commands::helm_release::CreateOptions as ReleaseOptions;
use seira::config::{ClusterContext, Settings};
use seira::utils::dryrun;
use seira::utils::errors::{display_error_and_exit, enhance_error};
use seira::utils::logger;
use std::io;
use std::iter;
use std::path::PathBuf;

/// Flags accepted anywhere on the command line
#[derive(Args, Debug, Clone, Default)]
struct GlobalArgs {
    /// Verbose output (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry-run mode: show mutating commands without running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Path to the seira config file (default: ./.seira.yml)
    #[arg(long, global = true, env = "SEIRA_CONFIG")]
    config: Option<PathBuf>,
}

impl GlobalArgs {
    fn merge(self, other: GlobalArgs) -> GlobalArgs {
        GlobalArgs {
            verbose: self.verbose.max(other.verbose),
            dry_run: self.dry_run || other.dry_run,
            config: other.config.or(self.config),
        }
    }
}

/// Global flags after `<app>`, where `--verbose` belongs to `db ps`
#[derive(Args, Debug, Clone, Default)]
struct AppGlobalArgs {
    /// Verbose output (-v: DEBUG, -vv: TRACE)
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry-run mode: show mutating commands without running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Path to the seira config file (default: ./.seira.yml)
    #[arg(long, global = true, env = "SEIRA_CONFIG")]
    config: Option<PathBuf>,
}

impl From<AppGlobalArgs> for GlobalArgs {
    fn from(args: AppGlobalArgs) -> Self {
        GlobalArgs {
            verbose: args.verbose,
            dry_run: args.dry_run,
            config: args.config,
        }
    }
}

#[derive(Parser)]
#[command(name = "seira")]
#[command(author, version, about = "Manage your Kubernetes PaaS on GKE, Cloud SQL and Helm", long_about = None)]
#[command(after_help = "Cluster commands:
  seira <cluster>                                   Switch gcloud and kubectl to the cluster
  seira <cluster> cluster <action> [args...]        Manage the cluster itself
  seira <cluster> node-pools <action> [args...]     For managing node pools for a cluster
  seira <cluster> proxy                             Open up the proxy UI for a given cluster
  seira <cluster> <app> <category> <action> [args]  Manage an app (see 'seira <cluster> <app> --help')")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up your local CLI with the right project and cluster configuration
    Setup {
        /// Cluster name, alias or "all"
        target: String,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,

    #[command(external_subcommand)]
    Cluster(Vec<String>),
}

/// Everything after `seira <cluster>`
#[derive(Parser)]
struct ClusterCli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    scope: Option<ClusterScope>,
}

#[derive(Subcommand)]
enum ClusterScope {
    /// Manage the cluster itself
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },

    /// For managing node pools for a cluster
    NodePools {
        #[command(subcommand)]
        action: NodePoolAction,
    },

    /// Open up the proxy UI for a given cluster
    Proxy,

    #[command(external_subcommand)]
    App(Vec<String>),
}

#[derive(Subcommand)]
enum ClusterAction {
    /// Create gcr-secret and cloudsql-credentials in the default namespace
    Bootstrap {
        /// Service account key used to pull images from gcr.io
        dockercfg: PathBuf,

        /// Cloud SQL proxy credentials
        cloudsql_credentials: PathBuf,
    },

    /// Print the current gcloud project and kubectl context
    Current,

    /// Upgrade the cluster master
    UpgradeMaster {
        /// Target master version
        version: String,
    },

    /// Blue/green upgrade of node pools to the master version
    UpgradeNodes {
        /// Only upgrade this pool
        #[arg(long)]
        pool: Option<String>,
    },
}

#[derive(Subcommand)]
enum NodePoolAction {
    /// List node pools
    List,

    /// List nodes of a pool
    ListNodes { pool: String },

    /// Add a node pool as a copy of an existing one
    Add {
        name: String,

        /// Pool to copy machine settings and node count from
        #[arg(long)]
        copy: String,

        #[arg(long)]
        node_version: Option<String>,
    },

    /// Mark the nodes of a pool unschedulable
    Cordon { pool: String },

    /// Evict all pods from the nodes of a pool
    Drain { pool: String },

    /// Cordon, drain and delete a pool
    Delete { pool: String },
}

/// Everything after `seira <cluster> <app>`
#[derive(Parser)]
struct AppCli {
    #[command(flatten)]
    global: AppGlobalArgs,

    #[command(subcommand)]
    category: Category,
}

#[derive(Subcommand)]
enum Category {
    /// Manage your application's secrets and environment variables
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },

    /// Manage your application's environment variables configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage your application's pods
    Pods {
        #[command(subcommand)]
        action: PodsAction,
    },

    /// Manage your application's jobs
    Jobs {
        #[command(subcommand)]
        action: JobsAction,
    },

    /// Manage your application's Cloud SQL databases
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Manage your Helm Redis instances
    Redis {
        #[command(subcommand)]
        action: RedisAction,
    },

    /// Manage your Helm Memcached instances
    Memcached {
        #[command(subcommand)]
        action: MemcachedAction,
    },

    /// Bootstrap, apply and restart your application
    App {
        #[command(subcommand)]
        action: AppAction,
    },
}

#[derive(Subcommand)]
enum SecretsAction {
    /// Print the decoded value of a key
    Get { key: Option<String> },

    /// Set KEY=value pairs
    Set { pairs: Vec<String> },

    /// Remove a key
    Unset { key: Option<String> },

    /// Print base64 encoded values
    List,

    /// Print decoded values
    ListDecoded,

    /// Write a secret with DB_USER and DB_PASSWORD
    CreatePgbouncerSecret {
        user: String,
        password: String,

        /// Secret name (default: pgbouncer-secrets)
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Get { key: Option<String> },
    Set { pairs: Vec<String> },
    Unset { key: Option<String> },
    List,
}

#[derive(Subcommand)]
enum PodsAction {
    List,

    Delete { pod: String },

    Logs {
        pod: String,

        /// Container name (default: the app name)
        #[arg(long)]
        container: Option<String>,
    },

    /// Resource usage of pods
    Top { pod: Option<String> },

    /// Open an interactive shell in a pod
    Connect {
        #[arg(long, default_value = "web")]
        tier: String,

        /// Pod to connect to (default: first running pod of the tier)
        #[arg(long)]
        pod: Option<String>,

        #[arg(long, default_value = "bash")]
        command: String,
    },
}

#[derive(Subcommand)]
enum JobsAction {
    List,

    Delete { job: String },

    Logs { job: String },

    /// Run a command in a one-off job cloned from a pod of the tier
    Run {
        #[arg(long, default_value = "web")]
        tier: String,

        /// Replace every container command with an idle loop
        #[arg(long)]
        clear_commands: bool,

        /// Start the job and return without waiting
        #[arg(long)]
        detached: bool,

        /// Container to run the command in (default: the app name)
        #[arg(long)]
        container: Option<String>,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Create a primary or read replica instance
    Create {
        #[arg(long)]
        version: Option<String>,

        /// vCPUs of a primary
        #[arg(long)]
        cpu: Option<u32>,

        /// Memory of a primary in GB
        #[arg(long)]
        memory: Option<u32>,

        /// Storage of a primary in GB
        #[arg(long)]
        storage: Option<u32>,

        /// Create a read replica of this instance
        #[arg(long)]
        primary: Option<String>,

        #[arg(long)]
        highly_available: bool,

        /// Point DATABASE_URL at the new instance
        #[arg(long)]
        set_as_primary: bool,

        /// Extra --flag=value arguments passed to gcloud
        #[arg(allow_hyphen_values = true)]
        extra: Vec<String>,
    },

    /// Register an instance created outside seira
    Add {
        name: String,

        #[arg(long)]
        primary: Option<String>,

        #[arg(long)]
        set_as_primary: bool,
    },

    Delete { name: String },

    List,

    /// Show running queries
    Ps {
        instance: Option<String>,

        /// Include idle connections
        #[arg(long = "verbose", id = "include_idle")]
        include_idle: bool,
    },

    /// Interactive psql session
    Connect { instance: Option<String> },

    AlterProxyuserRoles { name: String, root_password: String },

    ChangeRootPassword { instance: String },

    ChangeProxyuserPassword { instance: String },

    /// Write the pgbouncer manifest of an instance
    WritePgbouncerYaml { name: String },
}

#[derive(Subcommand)]
enum RedisAction {
    List,

    Status { name: String },

    /// Print the password of a release
    Credentials { name: String },

    Create {
        /// Size preset (1-9)
        #[arg(long)]
        size: Option<String>,

        #[arg(long)]
        memory: Option<String>,

        #[arg(long)]
        cpu: Option<String>,

        /// Existing volume claim to store data on
        #[arg(long)]
        volume: Option<String>,
    },

    Delete { name: String },
}

#[derive(Subcommand)]
enum MemcachedAction {
    List,

    Status { name: String },

    Create {
        /// Size preset (1-8)
        #[arg(long)]
        size: Option<String>,

        #[arg(long)]
        memory: Option<String>,

        #[arg(long)]
        cpu: Option<String>,
    },

    Delete { name: String },
}

#[derive(Subcommand)]
enum AppAction {
    /// Create the namespace, main secret and shared secrets
    Bootstrap,

    /// Render and apply the app's manifests
    Apply,

    /// Restart deployments
    Restart {
        #[arg(long)]
        tier: Option<String>,
    },

    /// Scale deployments: TIER=COUNT...
    Scale {
        #[arg(required = true)]
        targets: Vec<String>,
    },
}

/// A parsed invocation, ready to run
enum Invocation {
    Setup(String),
    Completion(Shell),
    Version,
    Switch(String),
    Cluster(String, ClusterScope),
    App(String, String, Category),
}

fn main() {
    if let Err(err) = run() {
        display_error_and_exit(enhance_error(err));
    }
}

/// Parse a nested command line, exiting with clap's usage output on failure
fn parse_nested<T: Parser>(bin_name: String, args: &[String]) -> T {
    T::try_parse_from(iter::once(bin_name).chain(args.iter().cloned())).unwrap_or_else(|e| e.exit())
}

fn parse() -> (GlobalArgs, Invocation) {
    let cli = Cli::parse();
    let global = cli.global;

    let cluster_args = match cli.command {
        Commands::Setup { target } => return (global, Invocation::Setup(target)),
        Commands::Completion { shell } => return (global, Invocation::Completion(shell)),
        Commands::Version => return (global, Invocation::Version),
        Commands::Cluster(args) => args,
    };

    let Some((cluster, rest)) = cluster_args.split_first() else {
        Cli::command().print_help().ok();
        std::process::exit(2);
    };

    let nested: ClusterCli = parse_nested(format!("seira {}", cluster), rest);
    let global = global.merge(nested.global);

    let app_args = match nested.scope {
        None => return (global, Invocation::Switch(cluster.clone())),
        Some(ClusterScope::App(args)) => args,
        Some(scope) => return (global, Invocation::Cluster(cluster.clone(), scope)),
    };

    let Some((app, rest)) = app_args.split_first() else {
        std::process::exit(2);
    };

    let nested: AppCli = parse_nested(format!("seira {} {}", cluster, app), rest);
    (
        global.merge(nested.global.into()),
        Invocation::App(cluster.clone(), app.clone(), nested.category),
    )
}

fn run() -> Result<()> {
    let (global, invocation) = parse();

    logger::init(global.verbose);
    if global.dry_run {
        dryrun::set_dry_run(true);
        seira::log_info!("DRY RUN MODE: No changes will be made");
    }

    match invocation {
        Invocation::Completion(shell) => handle_completion_command(shell),
        Invocation::Version => handle_version_command(),
        Invocation::Setup(target) => {
            let settings = Settings::load(global.config.as_deref())?;
            setup::run(&settings, &target)
        }
        Invocation::Switch(cluster) => {
            let context = cluster_context(&global, &cluster)?;
            seira::log_info!("Switched to cluster {}", context.cluster);
            Ok(())
        }
        Invocation::Cluster(cluster, scope) => {
            let context = cluster_context(&global, &cluster)?;
            handle_cluster_scope(&context, scope)
        }
        Invocation::App(cluster, app, category) => {
            let context = cluster_context(&global, &cluster)?;
            commands::validate_app(&context, &app)?;
            handle_app_category(&context, &app, category)
        }
    }
}

/// Resolve the cluster and point gcloud and kubectl at it
fn cluster_context(global: &GlobalArgs, cluster: &str) -> Result<ClusterContext> {
    let settings = Settings::load(global.config.as_deref())?;
    let context = ClusterContext::resolve(settings, cluster)?;
    commands::switch(&context)?;
    Ok(context)
}

fn handle_cluster_scope(context: &ClusterContext, scope: ClusterScope) -> Result<()> {
    match scope {
        ClusterScope::Cluster { action } => handle_cluster_command(context, action),
        ClusterScope::NodePools { action } => handle_node_pools_command(context, action),
        ClusterScope::Proxy => proxy::run(),
        // Routed to the app parser before this point
        ClusterScope::App(_) => Ok(()),
    }
}

fn handle_cluster_command(context: &ClusterContext, action: ClusterAction) -> Result<()> {
    match action {
        ClusterAction::Bootstrap {
            dockercfg,
            cloudsql_credentials,
        } => cluster::bootstrap(&dockercfg, &cloudsql_credentials),
        ClusterAction::Current => cluster::current(),
        ClusterAction::UpgradeMaster { version } => cluster::upgrade_master(context, &version),
        ClusterAction::UpgradeNodes { pool } => cluster::upgrade_nodes(context, pool.as_deref()),
    }
}

fn handle_node_pools_command(context: &ClusterContext, action: NodePoolAction) -> Result<()> {
    match action {
        NodePoolAction::List => node_pools::list(context),
        NodePoolAction::ListNodes { pool } => node_pools::list_nodes(&pool),
        NodePoolAction::Add {
            name,
            copy,
            node_version,
        } => node_pools::add(context, &name, &copy, node_version.as_deref()),
        NodePoolAction::Cordon { pool } => node_pools::cordon(context, &pool),
        NodePoolAction::Drain { pool } => node_pools::drain(context, &pool),
        NodePoolAction::Delete { pool } => node_pools::delete(context, &pool),
    }
}

fn handle_app_category(context: &ClusterContext, app: &str, category: Category) -> Result<()> {
    match category {
        Category::Secrets { action } => handle_secrets_command(context, app, action),
        Category::Config { action } => handle_config_command(context, app, action),
        Category::Pods { action } => handle_pods_command(app, action),
        Category::Jobs { action } => handle_jobs_command(app, action),
        Category::Db { action } => handle_db_command(context, app, action),
        Category::Redis { action } => handle_redis_command(context, app, action),
        Category::Memcached { action } => handle_memcached_command(context, app, action),
        Category::App { action } => handle_app_command(context, app, action),
    }
}

fn handle_secrets_command(context: &ClusterContext, app: &str, action: SecretsAction) -> Result<()> {
    match action {
        SecretsAction::Get { key } => secrets::get(context, app, key.as_deref()),
        SecretsAction::Set { pairs } => secrets::set(context, app, &pairs),
        SecretsAction::Unset { key } => secrets::unset(context, app, key.as_deref()),
        SecretsAction::List => secrets::list(context, app),
        SecretsAction::ListDecoded => secrets::list_decoded(context, app),
        SecretsAction::CreatePgbouncerSecret { user, password, name } => {
            secrets::create_pgbouncer_secret(context, app, &user, &password, name.as_deref())
        }
    }
}

fn handle_config_command(context: &ClusterContext, app: &str, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => config::get(app, key.as_deref()),
        ConfigAction::Set { pairs } => config::set(context, app, &pairs),
        ConfigAction::Unset { key } => config::unset(context, app, key.as_deref()),
        ConfigAction::List => config::list(app),
    }
}

fn handle_pods_command(app: &str, action: PodsAction) -> Result<()> {
    match action {
        PodsAction::List => pods::list(app),
        PodsAction::Delete { pod } => pods::delete(app, &pod),
        PodsAction::Logs { pod, container } => pods::logs(app, &pod, container.as_deref()),
        PodsAction::Top { pod } => pods::top(app, pod.as_deref()),
        PodsAction::Connect { tier, pod, command } => pods::connect(app, &tier, pod.as_deref(), &command),
    }
}

fn handle_jobs_command(app: &str, action: JobsAction) -> Result<()> {
    match action {
        JobsAction::List => jobs::list(app),
        JobsAction::Delete { job } => jobs::delete(app, &job),
        JobsAction::Logs { job } => jobs::logs(app, &job),
        JobsAction::Run {
            tier,
            clear_commands,
            detached,
            container,
            command,
        } => {
            let options = jobs::RunOptions {
                tier,
                clear_commands,
                detached,
                container,
            };
            jobs::run(app, &options, &command)
        }
    }
}

fn handle_db_command(context: &ClusterContext, app: &str, action: DbAction) -> Result<()> {
    match action {
        DbAction::Create {
            version,
            cpu,
            memory,
            storage,
            primary,
            highly_available,
            set_as_primary,
            extra,
        } => db::create(
            context,
            app,
            &db::CreateOptions {
                version,
                cpu,
                memory,
                storage,
                primary,
                highly_available,
                set_as_primary,
                extra,
            },
        ),
        DbAction::Add {
            name,
            primary,
            set_as_primary,
        } => db::add(context, app, &name, primary.as_deref(), set_as_primary),
        DbAction::Delete { name } => db::delete(context, app, &name),
        DbAction::List => db::list(context, app),
        DbAction::Ps {
            instance,
            include_idle,
        } => db::ps::run(context, app, instance.as_deref(), include_idle),
        DbAction::Connect { instance } => db::connect(context, app, instance.as_deref()),
        DbAction::AlterProxyuserRoles { name, root_password } => {
            db::alter_proxyuser_roles(context, app, &name, &root_password)
        }
        DbAction::ChangeRootPassword { instance } => db::change_root_password(context, app, &instance),
        DbAction::ChangeProxyuserPassword { instance } => {
            db::change_proxyuser_password(context, app, &instance)
        }
        DbAction::WritePgbouncerYaml { name } => db::write_pgbouncer_yaml(context, app, &name),
    }
}

fn handle_redis_command(context: &ClusterContext, app: &str, action: RedisAction) -> Result<()> {
    match action {
        RedisAction::List => redis::list(app),
        RedisAction::Status { name } => redis::status(app, &name),
        RedisAction::Credentials { name } => redis::credentials(context, app, &name),
        RedisAction::Create {
            size,
            memory,
            cpu,
            volume,
        } => redis::create(
            context,
            app,
            &ReleaseOptions {
                size,
                memory,
                cpu,
                volume,
            },
        ),
        RedisAction::Delete { name } => redis::delete(app, &name),
    }
}

fn handle_memcached_command(context: &ClusterContext, app: &str, action: MemcachedAction) -> Result<()> {
    match action {
        MemcachedAction::List => memcached::list(app),
        MemcachedAction::Status { name } => memcached::status(app, &name),
        MemcachedAction::Create { size, memory, cpu } => memcached::create(
            context,
            app,
            &ReleaseOptions {
                size,
                memory,
                cpu,
                volume: None,
            },
        ),
        MemcachedAction::Delete { name } => memcached::delete(app, &name),
    }
}

fn handle_app_command(context: &ClusterContext, app: &str, action: AppAction) -> Result<()> {
    match action {
        AppAction::Bootstrap => commands::app::bootstrap(context, app),
        AppAction::Apply => commands::app::apply(context, app),
        AppAction::Restart { tier } => commands::app::restart(app, tier.as_deref()),
        AppAction::Scale { targets } => commands::app::scale(app, &targets),
    }
}

fn handle_completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "seira", &mut io::stdout());
    Ok(())
}

fn handle_version_command() -> Result<()> {
    println!("seira {}", env!("CARGO_PKG_VERSION"));
    println!("Manage your Kubernetes PaaS on GKE, Cloud SQL and Helm");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_cli(args: &[&str]) -> AppCli {
        AppCli::try_parse_from(iter::once("seira staging web").chain(args.iter().copied())).unwrap()
    }

    fn cluster_cli(args: &[&str]) -> ClusterCli {
        ClusterCli::try_parse_from(iter::once("seira staging").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definitions() {
        Cli::command().debug_assert();
        ClusterCli::command().debug_assert();
        AppCli::command().debug_assert();
    }

    #[test]
    fn test_top_level_commands() {
        let cli = Cli::try_parse_from(["seira", "setup", "all"]).unwrap();
        assert!(matches!(cli.command, Commands::Setup { target } if target == "all"));

        let cli = Cli::try_parse_from(["seira", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));

        let cli = Cli::try_parse_from(["seira", "--dry-run", "staging", "web", "pods", "list"]).unwrap();
        assert!(cli.global.dry_run);
        assert!(matches!(cli.command, Commands::Cluster(args) if args == ["staging", "web", "pods", "list"]));
    }

    #[test]
    fn test_cluster_scopes() {
        assert!(cluster_cli(&[]).scope.is_none());
        assert!(matches!(cluster_cli(&["proxy"]).scope, Some(ClusterScope::Proxy)));

        let cli = cluster_cli(&["-v", "cluster", "upgrade-nodes", "--pool", "default-pool"]);
        assert_eq!(cli.global.verbose, 1);
        assert!(matches!(
            cli.scope,
            Some(ClusterScope::Cluster {
                action: ClusterAction::UpgradeNodes { pool: Some(pool) }
            }) if pool == "default-pool"
        ));

        let cli = cluster_cli(&["node-pools", "add", "pool-2", "--copy", "pool"]);
        assert!(matches!(
            cli.scope,
            Some(ClusterScope::NodePools {
                action: NodePoolAction::Add { name, copy, node_version: None }
            }) if name == "pool-2" && copy == "pool"
        ));

        let cli = cluster_cli(&["web", "db", "list"]);
        assert!(matches!(cli.scope, Some(ClusterScope::App(args)) if args == ["web", "db", "list"]));
    }

    #[test]
    fn test_secrets_and_config() {
        let cli = app_cli(&["secrets", "set", "A=1", "B=2"]);
        assert!(matches!(
            cli.category,
            Category::Secrets { action: SecretsAction::Set { pairs } } if pairs == ["A=1", "B=2"]
        ));

        let cli = app_cli(&["config", "get", "RAILS_ENV"]);
        assert!(matches!(
            cli.category,
            Category::Config { action: ConfigAction::Get { key: Some(key) } } if key == "RAILS_ENV"
        ));
    }

    #[test]
    fn test_pods_and_jobs() {
        let cli = app_cli(&["pods", "connect", "--command", "rails c"]);
        assert!(matches!(
            cli.category,
            Category::Pods { action: PodsAction::Connect { tier, pod: None, command } }
                if tier == "web" && command == "rails c"
        ));

        let cli = app_cli(&["jobs", "run", "--detached", "rake", "db:migrate", "--trace"]);
        assert!(matches!(
            cli.category,
            Category::Jobs { action: JobsAction::Run { detached: true, command, .. } }
                if command == ["rake", "db:migrate", "--trace"]
        ));
    }

    #[test]
    fn test_db_ps_flags() {
        let cli = app_cli(&["db", "ps"]);
        assert_eq!(cli.global.verbose, 0);
        assert!(matches!(
            cli.category,
            Category::Db { action: DbAction::Ps { instance: None, include_idle: false } }
        ));

        let cli = app_cli(&["db", "ps", "--verbose"]);
        assert_eq!(cli.global.verbose, 0);
        assert!(matches!(
            cli.category,
            Category::Db { action: DbAction::Ps { include_idle: true, .. } }
        ));

        let cli = app_cli(&["db", "ps", "-v", "--verbose"]);
        assert_eq!(cli.global.verbose, 1);
        assert!(matches!(
            cli.category,
            Category::Db { action: DbAction::Ps { include_idle: true, .. } }
        ));
    }

    #[test]
    fn test_db_create_passthrough() {
        let cli = app_cli(&["db", "create", "--cpu", "2", "--", "--database-flags=max_connections=200"]);
        assert!(matches!(
            cli.category,
            Category::Db { action: DbAction::Create { cpu: Some(2), extra, .. } }
                if extra == ["--database-flags=max_connections=200"]
        ));
    }

    #[test]
    fn test_helm_releases_and_app() {
        let cli = app_cli(&["redis", "create", "--size", "3", "--volume", "redis-data"]);
        assert!(matches!(
            cli.category,
            Category::Redis { action: RedisAction::Create { size: Some(size), volume: Some(volume), .. } }
                if size == "3" && volume == "redis-data"
        ));

        let cli = app_cli(&["memcached", "delete", "happy-panda"]);
        assert!(matches!(
            cli.category,
            Category::Memcached { action: MemcachedAction::Delete { name } } if name == "happy-panda"
        ));

        let cli = app_cli(&["--dry-run", "app", "scale", "web=3"]);
        assert!(cli.global.dry_run);
        assert!(matches!(
            cli.category,
            Category::App { action: AppAction::Scale { targets } } if targets == ["web=3"]
        ));

        assert!(AppCli::try_parse_from(["seira staging web", "app", "scale"]).is_err());
    }

    #[test]
    fn test_global_args_merge() {
        let outer = GlobalArgs {
            verbose: 1,
            dry_run: false,
            config: Some(PathBuf::from("outer.yml")),
        };
        let inner = GlobalArgs {
            verbose: 2,
            dry_run: true,
            config: None,
        };

        let merged = outer.merge(inner);
        assert_eq!(merged.verbose, 2);
        assert!(merged.dry_run);
        assert_eq!(merged.config, Some(PathBuf::from("outer.yml")));
    }
}
