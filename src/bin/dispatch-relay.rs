use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretVec;

use dispatch_relay::config::{DEFAULT_WEBHOOK_PATH, DEFAULT_WORKFLOW_REF};
use dispatch_relay::github::GithubRepoName;
use dispatch_relay::queue::consume_queue;
use dispatch_relay::queue::nats::NatsQueue;
use dispatch_relay::utils::logging::setup_logging;
use dispatch_relay::{
    create_app, create_github_client, create_relay_process, github_base_url, DispatchTarget,
    GithubAppClient, RelayContext, RelayProcess, ServerState, TriggerActions, WebhookSecret,
};

#[derive(clap::Parser)]
struct Opts {
    /// Github App ID.
    #[arg(long, env = "APP_ID")]
    app_id: u64,

    /// Path to the private key used to authenticate as a Github App.
    #[arg(long, env = "PRIVATE_KEY_PATH")]
    private_key_path: PathBuf,

    /// Owner of the repository whose workflow is dispatched.
    #[arg(long, env = "CENTRAL_REPO_OWNER")]
    repo_owner: String,

    /// Name of the repository whose workflow is dispatched.
    #[arg(long, env = "CENTRAL_REPO")]
    repo_name: String,

    /// Workflow file name or ID to dispatch.
    #[arg(long, env = "WORKFLOW_NAME")]
    workflow: String,

    /// Git reference on which the workflow runs.
    #[arg(long, env = "WORKFLOW_REF", default_value = DEFAULT_WORKFLOW_REF)]
    workflow_ref: String,

    /// Hostname of a GitHub Enterprise Server instance.
    #[arg(long, env = "ENTERPRISE_HOSTNAME")]
    enterprise_hostname: Option<String>,

    #[command(subcommand)]
    ingress: Ingress,
}

#[derive(clap::Subcommand)]
enum Ingress {
    /// Receive pull request webhooks over HTTP.
    Webhook {
        /// Secret used to authenticate webhooks.
        #[arg(long, env = "WEBHOOK_SECRET")]
        webhook_secret: String,

        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,

        /// Path on which webhooks are received.
        #[arg(long, env = "WEBHOOK_PATH", default_value = DEFAULT_WEBHOOK_PATH)]
        path: String,

        /// Comma separated pull request actions that trigger the workflow.
        #[arg(long, env = "TRIGGER_ACTIONS", default_value = "opened")]
        trigger_actions: TriggerActions,
    },
    /// Consume pull request notifications from a NATS JetStream stream.
    Queue {
        /// URL of the NATS server.
        #[arg(long, env = "QUEUE_CONNECTION_STRING")]
        connection_string: String,

        /// Name of the JetStream stream.
        #[arg(long, env = "QUEUE_NAME")]
        queue_name: String,

        /// Name of the durable consumer.
        #[arg(long, env = "QUEUE_CONSUMER", default_value = "dispatch-relay")]
        consumer: String,
    },
}

async fn load_relay_context(opts: &Opts) -> anyhow::Result<RelayContext> {
    let private_key = std::fs::read(&opts.private_key_path).with_context(|| {
        format!(
            "Could not read private key from {}",
            opts.private_key_path.display()
        )
    })?;
    let base_url = github_base_url(opts.enterprise_hostname.as_deref());
    let client = create_github_client(
        opts.app_id.into(),
        base_url.clone(),
        SecretVec::new(private_key),
    )?;

    let app = GithubAppClient::new(client);
    let name = app.load_app_name().await?;
    tracing::info!("Authenticated as GitHub App {name} on {base_url}");

    let target = DispatchTarget::new(
        GithubRepoName::new(&opts.repo_owner, &opts.repo_name),
        opts.workflow.clone(),
    )
    .with_ref(opts.workflow_ref.clone());
    tracing::info!("Pull requests will dispatch {target}");
    Ok(RelayContext::new(app, target))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(error) => {
                tracing::error!("Could not listen for SIGTERM: {error:?}");
                if let Err(error) = tokio::signal::ctrl_c().await {
                    tracing::error!("Could not listen for interrupt signal: {error:?}");
                }
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!("Could not listen for interrupt signal: {error:?}");
        }
    }
    tracing::info!("Shutting down");
}

async fn serve_webhooks(
    relay: RelayProcess,
    secret: String,
    port: u16,
    path: String,
    trigger_actions: TriggerActions,
) -> anyhow::Result<()> {
    if !path.starts_with('/') {
        return Err(anyhow::anyhow!("Webhook path `{path}` must start with `/`"));
    }
    tracing::info!("Relaying pull request actions: {trigger_actions}");
    let state = ServerState::new(relay.tx, WebhookSecret::new(secret), trigger_actions);
    let app = create_app(state, &path);
    let relay_process = tokio::spawn(relay.process);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Server listening at: http://localhost:{port}{path}");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server has failed");

    // The server owned the last sender, so the relay process finishes its in-flight
    // notifications and ends.
    if let Err(error) = relay_process.await {
        tracing::error!("Relay process has failed: {error:?}");
    }
    result
}

async fn consume_notifications(
    relay: RelayProcess,
    connection_string: String,
    queue_name: String,
    consumer: String,
) -> anyhow::Result<()> {
    let queue = NatsQueue::connect(&connection_string, &queue_name, &consumer).await?;
    let messages = queue.messages().await?;
    let relay_process = tokio::spawn(relay.process);

    let result = tokio::select! {
        result = consume_queue(messages, relay.tx) => result,
        () = shutdown_signal() => Ok(()),
    };

    if let Err(error) = relay_process.await {
        tracing::error!("Relay process has failed: {error:?}");
    }
    queue.close().await?;
    result
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;

    runtime.block_on(async move {
        let ctx = load_relay_context(&opts).await?;
        let relay = create_relay_process(ctx);

        match opts.ingress {
            Ingress::Webhook {
                webhook_secret,
                port,
                path,
                trigger_actions,
            } => serve_webhooks(relay, webhook_secret, port, path, trigger_actions).await,
            Ingress::Queue {
                connection_string,
                queue_name,
                consumer,
            } => consume_notifications(relay, connection_string, queue_name, consumer).await,
        }
    })
}

fn main() {
    // Settings may also be provided through a `.env` file.
    dotenv::dotenv().ok();
    setup_logging();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}
