//! Main runtime orchestration.
//!
//! The runtime owns the rule set and the dispatcher, starts adapters with
//! a [`TransportContext`] holding the transports enabled at build time, and
//! spawns one dispatch task per inbound message.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use retort_runtime::RetortRuntime;
//! use retort_adapter_discord::DiscordAdapter;
//!
//! let runtime = RetortRuntime::builder()
//!     .config_file("retort.toml")
//!     .set("rules", "rules.json")
//!     .build()?;
//!
//! runtime.register_adapter::<DiscordAdapter>().await?;
//! runtime.run().await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::signal;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use retort_core::{
    AdapterContext, BoxedAdapter, BoxedBot, ConfigurableAdapter, Dispatcher, EventSink,
    MessageEvent, RuleSet, TransportContext,
};

use crate::config::{ConfigLoader, ConfigResult, RetortConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// The Retort runtime.
pub struct RetortRuntime {
    config: RetortConfig,
    dispatcher: Dispatcher,
    /// Adapters by name.
    adapters: Arc<RwLock<HashMap<String, BoxedAdapter>>>,
    /// Contexts of started adapters.
    contexts: Arc<Mutex<HashMap<String, AdapterContext>>>,
    transport_context: TransportContext,
    running: Arc<RwLock<bool>>,
}

impl RetortRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from loaded settings.
    ///
    /// Initializes logging, validates the settings and loads the rules
    /// file. Any invalid rule pattern is an error here.
    pub fn from_config(config: RetortConfig) -> ConfigResult<Self> {
        logging::init_from_config(&config.logging);
        validate_config(&config)?;

        let rules = load_rules(&config.rules)?;
        Ok(Self::with_rules(config, rules))
    }

    /// Creates a runtime around an already loaded rule set.
    ///
    /// Logging is left to the caller.
    pub fn with_rules(config: RetortConfig, rules: RuleSet) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(Arc::new(rules)),
            adapters: Arc::new(RwLock::new(HashMap::new())),
            contexts: Arc::new(Mutex::new(HashMap::new())),
            transport_context: Self::create_default_transport_context(),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Returns the settings.
    pub fn config(&self) -> &RetortConfig {
        &self.config
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Replaces the transport capabilities handed to adapters.
    pub fn set_transport_context(&mut self, ctx: TransportContext) {
        self.transport_context = ctx;
    }

    /// Creates a TransportContext with every transport enabled by cargo features.
    #[allow(unused_mut)]
    fn create_default_transport_context() -> TransportContext {
        let mut ctx = TransportContext::new();

        #[cfg(feature = "ws-client")]
        {
            use retort_transport::websocket::WsClientCapabilityImpl;
            ctx = ctx.with_ws_client(Arc::new(WsClientCapabilityImpl::new()));
            debug!("Registered WsClient capability");
        }

        #[cfg(feature = "http-client")]
        {
            use retort_transport::http::HttpClientCapabilityImpl;
            ctx = ctx.with_http_client(Arc::new(HttpClientCapabilityImpl::new()));
            debug!("Registered HttpClient capability");
        }

        ctx
    }

    /// Registers an adapter built from its settings table.
    ///
    /// The table is `adapters.<A::name()>`; without one the adapter's
    /// default configuration is used.
    ///
    /// ```rust,ignore
    /// runtime.register_adapter::<DiscordAdapter>().await?;
    /// ```
    pub async fn register_adapter<A>(&self) -> RuntimeResult<()>
    where
        A: ConfigurableAdapter + 'static,
    {
        let adapter_name = A::name();

        let config: A::Config = if let Some(config_value) = self.config.adapters.get(adapter_name) {
            config_value.deserialize().map_err(|e| {
                RuntimeError::AdapterConfigDeserialize(format!(
                    "Failed to deserialize config for adapter '{adapter_name}': {e}"
                ))
            })?
        } else {
            warn!(
                adapter = adapter_name,
                "No configuration found for adapter, using default"
            );
            Default::default()
        };

        let adapter = A::from_config(config)?;
        self.add_adapter(adapter_name, adapter).await;
        Ok(())
    }

    /// Registers an already constructed adapter under `name`.
    pub async fn add_adapter(&self, name: impl Into<String>, adapter: BoxedAdapter) {
        let name = name.into();
        let mut adapters = self.adapters.write().await;
        if adapters.insert(name.clone(), adapter).is_some() {
            warn!(adapter = %name, "Replaced previously registered adapter");
        }
        info!(adapter = %name, "Registered adapter");
    }

    /// Returns the number of registered adapters.
    pub async fn adapter_count(&self) -> usize {
        self.adapters.read().await.len()
    }

    /// Returns whether the runtime is currently running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Creates the sink adapters hand inbound messages to.
    ///
    /// Each message is dispatched on its own task, so a slow send never
    /// holds up the connection that delivered the message.
    pub fn event_sink(&self) -> EventSink {
        let dispatcher = self.dispatcher.clone();
        Arc::new(move |event: MessageEvent, bot: BoxedBot| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.handle(&event, bot.as_ref()).await;
            });
        })
    }

    /// Starts every registered adapter.
    ///
    /// If one adapter fails, the ones already started are shut down again.
    pub async fn start(&self) -> RuntimeResult<()> {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("Runtime is already running");
                return Ok(());
            }
            *running = true;
        }

        info!(rules = self.dispatcher.rules().len(), "Starting Retort runtime");

        let adapters = self.adapters.read().await;
        if adapters.is_empty() {
            *self.running.write().await = false;
            return Err(RuntimeError::NoAdapters);
        }

        let mut failure = None;
        {
            let mut contexts = self.contexts.lock().await;
            for (name, adapter) in adapters.iter() {
                let mut ctx = AdapterContext::new(self.transport_context.clone(), self.event_sink());
                match adapter.on_start(&mut ctx).await {
                    Ok(()) => {
                        info!(adapter = %name, "Adapter started");
                        contexts.insert(name.clone(), ctx);
                    }
                    Err(e) => {
                        error!(adapter = %name, error = %e, "Failed to start adapter");
                        ctx.close_connections();
                        failure = Some(RuntimeError::AdapterStart {
                            adapter: name.clone(),
                            reason: format!("{e:#}"),
                        });
                        break;
                    }
                }
            }
        }
        drop(adapters);

        if let Some(err) = failure {
            self.shutdown_adapters().await;
            *self.running.write().await = false;
            return Err(err);
        }

        info!("Runtime started");
        Ok(())
    }

    /// Stops the runtime and all adapters.
    pub async fn stop(&self) -> RuntimeResult<()> {
        {
            let mut running = self.running.write().await;
            if !*running {
                warn!("Runtime is not running");
                return Ok(());
            }
            *running = false;
        }

        info!("Stopping Retort runtime");
        self.shutdown_adapters().await;
        info!("Runtime stopped");

        Ok(())
    }

    async fn shutdown_adapters(&self) {
        let adapters = self.adapters.read().await;
        let mut contexts = self.contexts.lock().await;

        for (name, mut ctx) in contexts.drain() {
            if let Some(adapter) = adapters.get(&name)
                && let Err(e) = adapter.on_shutdown(&mut ctx).await
            {
                error!(adapter = %name, error = %e, "Error during adapter shutdown");
            }
            ctx.close_connections();
        }
    }

    /// Runs the runtime until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start().await?;

        info!("Retort is now running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;

        self.stop().await
    }

    /// Runs the runtime until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.stop().await
    }
}

fn load_rules(path: &Path) -> ConfigResult<RuleSet> {
    match RuleSet::load(path) {
        Ok(rules) => {
            if rules.is_empty() {
                warn!(path = %path.display(), "Rule file is empty, no message will be answered");
            }
            info!(path = %path.display(), rules = rules.len(), "Loaded rules");
            Ok(rules)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to load rules");
            Err(e.into())
        }
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                let _ = signal::ctrl_c().await;
                info!("Received Ctrl+C, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`RetortRuntime`].
///
/// ```rust,ignore
/// let runtime = RetortRuntime::builder()
///     .profile("production")
///     .set("adapters.discord.token", token)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific settings file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for settings files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides one dotted settings key.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Loads settings and rules, then builds the runtime.
    pub fn build(self) -> ConfigResult<RetortRuntime> {
        let config = self.config_loader.load()?;
        RetortRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use async_trait::async_trait;
    use figment::Jail;
    use parking_lot::Mutex as SyncMutex;
    use retort_core::{Adapter, AdapterResult, ApiResult, Bot, RuleSetError};
    use std::time::Duration;
    use tokio::sync::Notify;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct RecordingBot {
        sent: SyncMutex<Vec<(String, String)>>,
        notify: Notify,
    }

    #[async_trait]
    impl Bot for RecordingBot {
        fn self_id(&self) -> Option<String> {
            Some("bot".into())
        }

        fn adapter_name(&self) -> &str {
            "fake"
        }

        async fn send_message(&self, channel_id: &str, text: &str) -> ApiResult<String> {
            self.sent.lock().push((channel_id.into(), text.into()));
            self.notify.notify_one();
            Ok("m".into())
        }
    }

    /// Delivers a fixed list of messages when started.
    struct ScriptedAdapter {
        bot: Arc<RecordingBot>,
        messages: Vec<MessageEvent>,
        fail: bool,
    }

    #[async_trait]
    impl Adapter for ScriptedAdapter {
        fn name() -> &'static str {
            "fake"
        }

        async fn on_start(&self, ctx: &mut AdapterContext) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("cannot reach platform");
            }
            for event in &self.messages {
                ctx.dispatch(event.clone(), self.bot.clone());
            }
            Ok(())
        }
    }

    #[derive(Default, serde::Deserialize)]
    struct TokenConfig {
        #[serde(default)]
        token: String,
    }

    struct TokenAdapter;

    #[async_trait]
    impl Adapter for TokenAdapter {
        fn name() -> &'static str {
            "token"
        }

        async fn on_start(&self, _ctx: &mut AdapterContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl ConfigurableAdapter for TokenAdapter {
        type Config = TokenConfig;

        fn from_config(config: TokenConfig) -> AdapterResult<Arc<Self>> {
            if config.token.is_empty() {
                return Err(retort_core::AdapterError::internal("token missing"));
            }
            Ok(Arc::new(Self))
        }
    }

    fn greeting_rules() -> RuleSet {
        RuleSet::from_json(r#"[{"regex": "^hello", "response": "hi!"}]"#).unwrap()
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_messages_flow_to_replies() {
        let runtime = RetortRuntime::with_rules(RetortConfig::default(), greeting_rules());
        let bot = Arc::new(RecordingBot::default());
        runtime
            .add_adapter(
                "fake",
                Arc::new(ScriptedAdapter {
                    bot: Arc::clone(&bot),
                    messages: vec![
                        MessageEvent::new("1", "general", "alice", "hello there"),
                        MessageEvent::new("2", "general", "alice", "goodbye"),
                    ],
                    fail: false,
                }),
            )
            .await;

        let waiter = Arc::clone(&bot);
        runtime
            .run_until(async move {
                let _ = tokio::time::timeout(Duration::from_secs(5), waiter.notify.notified()).await;
                // Let the non-matching dispatch finish too.
                tokio::time::sleep(Duration::from_millis(50)).await;
            })
            .await
            .unwrap();

        assert_eq!(
            *bot.sent.lock(),
            vec![("general".to_string(), "hi!".to_string())]
        );
        assert!(!runtime.is_running().await);
    }

    #[tokio::test]
    async fn test_start_without_adapters_fails() {
        let runtime = RetortRuntime::with_rules(RetortConfig::default(), greeting_rules());
        assert!(matches!(
            runtime.start().await,
            Err(RuntimeError::NoAdapters)
        ));
        assert!(!runtime.is_running().await);
    }

    #[tokio::test]
    async fn test_adapter_start_failure_is_reported() {
        let runtime = RetortRuntime::with_rules(RetortConfig::default(), greeting_rules());
        runtime
            .add_adapter(
                "fake",
                Arc::new(ScriptedAdapter {
                    bot: Arc::new(RecordingBot::default()),
                    messages: Vec::new(),
                    fail: true,
                }),
            )
            .await;

        match runtime.start().await {
            Err(RuntimeError::AdapterStart { adapter, reason }) => {
                assert_eq!(adapter, "fake");
                assert!(reason.contains("cannot reach platform"));
            }
            other => panic!("expected start failure, got {other:?}"),
        }
        assert!(!runtime.is_running().await);
    }

    #[tokio::test]
    async fn test_register_adapter_uses_settings_table() {
        let config: RetortConfig = figment::Figment::new()
            .merge(figment::providers::Serialized::default("adapters.token.token", "abc"))
            .extract()
            .unwrap();
        let runtime = RetortRuntime::with_rules(config, RuleSet::default());

        runtime.register_adapter::<TokenAdapter>().await.unwrap();
        assert_eq!(runtime.adapter_count().await, 1);
    }

    #[tokio::test]
    async fn test_register_adapter_without_settings_uses_default() {
        let runtime = RetortRuntime::with_rules(RetortConfig::default(), RuleSet::default());

        let result = runtime.register_adapter::<TokenAdapter>().await;
        assert!(matches!(result, Err(RuntimeError::Adapter(_))));
        assert_eq!(runtime.adapter_count().await, 0);
    }

    #[test]
    fn test_build_loads_rules() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "rules.json",
                r#"[{"regex": "^ping$", "response": "pong"}, {"regex": "help", "response": "?"}]"#,
            )?;

            let runtime = RetortRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .set("rules", jail.directory().join("rules.json"))
                .build()
                .map_err(|e| e.to_string())?;
            assert_eq!(runtime.dispatcher().rules().len(), 2);
            Ok(())
        });
    }

    #[test]
    fn test_build_fails_on_invalid_pattern() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "rules.json",
                r#"[{"regex": "^ok$", "response": "fine"}, {"regex": "([unclosed", "response": "x"}]"#,
            )?;

            let result = RetortRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .set("rules", jail.directory().join("rules.json"))
                .build();
            assert!(matches!(
                result,
                Err(ConfigError::Rules(RuleSetError::Pattern { index: 1, .. }))
            ));
            Ok(())
        });
    }

    #[test]
    fn test_build_fails_on_missing_rules_file() {
        Jail::expect_with(|jail| {
            let result = RetortRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .set("rules", jail.directory().join("nope.json"))
                .build();
            assert!(matches!(
                result,
                Err(ConfigError::Rules(RuleSetError::Read { .. }))
            ));
            Ok(())
        });
    }
}
