use {
    envsync_common::{StatusCallback, StatusData, StatusEvent, SyncStep},
    envsync_plugins::{EnvData, RunContext, SyncTarget},
    futures::future::join_all,
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

/// Run every hook of `target`.
///
/// Required secrets are checked against `env` before anything else happens.
/// Then each plugin's global hook runs in resolution order, followed by every
/// plugin's per-repository hook for each repository in configured order.
/// Each transition is reported through `status`, which is awaited before the
/// sync moves on.
///
/// # Errors
///
/// - [`Error::MissingRequiredSecrets`] listing every required secret `env`
///   lacks. No hook has run at that point.
/// - [`Error::Hook`] for the first hook that fails; nothing runs after it.
pub async fn sync_target(target: &SyncTarget, env: &EnvData, status: &dyn StatusCallback) -> Result<()> {
    let missing: Vec<String> = target
        .secrets
        .required_names()
        .filter(|name| !env.has_secret(name))
        .map(str::to_owned)
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingRequiredSecrets { names: missing });
    }

    let name = target.name.as_deref();
    let data = || StatusData::default().with_target(name);
    let repos = &target.repos;

    info!(target_group = target.display_name(), repos = repos.len(), dry_run = env.dry_run, "syncing target");

    emit(status, SyncStep::GlobalStart, "Syncing global environment...", data().with_count(repos.len())).await;

    for plugin in target.plugins.plugins() {
        let Some(hook) = plugin.run() else {
            continue;
        };
        let plugin_name = plugin.name();

        emit(status, SyncStep::Run, format!("Running {plugin_name} globally..."), data().with_plugin(plugin_name)).await;

        let ctx = RunContext {
            config: target,
            env,
            status,
            settings: target.settings_for(plugin_name),
            repo: None,
        };
        hook.call(ctx)
            .await
            .map_err(|source| Error::hook(plugin_name, None, source))?;

        emit(
            status,
            SyncStep::RunComplete,
            format!("...completed {plugin_name} globally."),
            data().with_plugin(plugin_name),
        )
        .await;
    }

    emit(status, SyncStep::GlobalDone, "...completed global environment.", data()).await;
    emit(status, SyncStep::ReposStart, format!("Syncing {} repos...", repos.len()), data().with_count(repos.len())).await;

    for repo in repos {
        for plugin in target.plugins.plugins() {
            let Some(hook) = plugin.run_on_repo() else {
                continue;
            };
            let plugin_name = plugin.name();

            emit(
                status,
                SyncStep::RunOnRepo,
                format!("Running {plugin_name} on {repo}..."),
                data().with_plugin(plugin_name).with_repo(repo),
            )
            .await;

            let ctx = RunContext {
                config: target,
                env,
                status,
                settings: target.settings_for(plugin_name),
                repo: Some(repo.as_str()),
            };
            hook.call(ctx)
                .await
                .map_err(|source| Error::hook(plugin_name, Some(repo.as_str()), source))?;

            emit(
                status,
                SyncStep::RunOnRepoComplete,
                format!("...completed {plugin_name} on {repo}."),
                data().with_plugin(plugin_name).with_repo(repo),
            )
            .await;
        }
    }

    emit(status, SyncStep::ReposDone, "...completed repos.", data()).await;
    debug!(target_group = target.display_name(), "target synced");
    Ok(())
}

/// Sync every target concurrently.
///
/// A failing target does not stop the others; once all have finished, every
/// failure is reported together.
///
/// # Errors
///
/// [`Error::TargetsFailed`] with one [`Error::Target`] per failed target.
pub async fn sync_all(targets: &[SyncTarget], env: &EnvData, status: &dyn StatusCallback) -> Result<()> {
    let results = join_all(targets.iter().map(|target| async move {
        sync_target(target, env, status)
            .await
            .map_err(|e| Error::target(target.display_name(), e))
    }))
    .await;

    let failures: Vec<Error> = results.into_iter().filter_map(|result| result.err()).collect();
    if failures.is_empty() {
        info!(targets = targets.len(), "all targets synced");
        return Ok(());
    }

    for failure in &failures {
        warn!(error = %failure, "target failed");
    }
    Err(Error::TargetsFailed { failures })
}

async fn emit(status: &dyn StatusCallback, step: SyncStep, message: impl Into<String>, data: StatusData) {
    status.on_status(StatusEvent::new(step, message, data)).await;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use {
        async_trait::async_trait,
        envsync_common::{NoopStatus, StatusRecorder},
        envsync_config::{PluginSettings, ResolvedConfig},
        envsync_plugins::{PluginDefinition, PluginHook, ResolvedPluginSet, SecretNeeds, SecretRequirement},
        secrecy::SecretString,
        serde_json::json,
    };

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Hook recording `"<label>"` or `"<label>@<repo>"` on every call.
    struct SpyHook {
        label: String,
        log: Log,
        fail: bool,
    }

    #[async_trait]
    impl PluginHook for SpyHook {
        async fn call(&self, ctx: RunContext<'_>) -> anyhow::Result<()> {
            let entry = match ctx.repo {
                Some(repo) => format!("{}@{repo}", self.label),
                None => self.label.clone(),
            };
            self.log.lock().unwrap().push(entry);
            if self.fail {
                anyhow::bail!("{} exploded", self.label);
            }
            Ok(())
        }
    }

    fn spy(label: &str, log: &Log) -> SpyHook {
        SpyHook {
            label: label.to_string(),
            log: Arc::clone(log),
            fail: false,
        }
    }

    fn failing(label: &str, log: &Log) -> SpyHook {
        SpyHook {
            fail: true,
            ..spy(label, log)
        }
    }

    fn target(name: &str, plugins: Vec<PluginDefinition>, repos: &[&str]) -> SyncTarget {
        SyncTarget {
            name: Some(name.to_string()),
            repos: repos.iter().map(|r| r.to_string()).collect(),
            plugins: plugins.into_iter().collect(),
            secrets: SecretNeeds::new(),
            config: ResolvedConfig::default(),
        }
    }

    fn env_with(secrets: &[(&str, &str)]) -> EnvData {
        EnvData::with_secrets(
            secrets
                .iter()
                .map(|(k, v)| (k.to_string(), SecretString::new(v.to_string())))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[tokio::test]
    async fn missing_required_secret_stops_before_any_hook() {
        let log = Log::default();
        let vault = Arc::new(PluginDefinition::new("vault").provides_secret("db", "Database password"));
        let mut target = target(
            "web",
            vec![PluginDefinition::new("app").needs_secret("db").on_run(spy("app", &log))],
            &["org/web"],
        );
        target.secrets.insert("db", SecretRequirement {
            required: true,
            provider: Arc::clone(&vault),
        });
        target.secrets.insert("cache", SecretRequirement {
            required: false,
            provider: vault,
        });
        let status = StatusRecorder::new();

        let err = sync_target(&target, &env_with(&[("db", "")]), &status).await.unwrap_err();

        assert!(
            matches!(&err, Error::MissingRequiredSecrets { names } if *names == vec!["db".to_string()]),
            "{err}"
        );
        assert!(log.lock().unwrap().is_empty());
        assert!(status.events().is_empty());
    }

    #[tokio::test]
    async fn events_follow_the_fixed_sequence() {
        let log = Log::default();
        let target = target(
            "web",
            vec![
                PluginDefinition::new("env"),
                PluginDefinition::new("build").on_run(spy("build", &log)),
                PluginDefinition::new("deploy")
                    .on_run(spy("deploy", &log))
                    .on_run_on_repo(spy("deploy", &log)),
                PluginDefinition::new("notify").on_run_on_repo(spy("notify", &log)),
            ],
            &["org/a", "org/b"],
        );
        let status = StatusRecorder::new();

        sync_target(&target, &EnvData::default(), &status).await.unwrap();

        assert_eq!(status.steps(), vec![
            SyncStep::GlobalStart,
            SyncStep::Run,
            SyncStep::RunComplete,
            SyncStep::Run,
            SyncStep::RunComplete,
            SyncStep::GlobalDone,
            SyncStep::ReposStart,
            SyncStep::RunOnRepo,
            SyncStep::RunOnRepoComplete,
            SyncStep::RunOnRepo,
            SyncStep::RunOnRepoComplete,
            SyncStep::RunOnRepo,
            SyncStep::RunOnRepoComplete,
            SyncStep::RunOnRepo,
            SyncStep::RunOnRepoComplete,
            SyncStep::ReposDone,
        ]);
        assert_eq!(*log.lock().unwrap(), vec![
            "build",
            "deploy",
            "deploy@org/a",
            "notify@org/a",
            "deploy@org/b",
            "notify@org/b",
        ]);

        let events = status.events();
        assert_eq!(events[0].message, "Syncing global environment...");
        assert_eq!(events[0].data, StatusData::default().with_target(Some("web")).with_count(2));
        assert_eq!(events[1].message, "Running build globally...");
        assert_eq!(events[7].message, "Running deploy on org/a...");
        assert_eq!(
            events[7].data,
            StatusData::default()
                .with_target(Some("web"))
                .with_plugin("deploy")
                .with_repo("org/a")
        );
        assert_eq!(events[15].message, "...completed repos.");
    }

    #[tokio::test]
    async fn failing_hook_aborts_the_target() {
        let log = Log::default();
        let target = target(
            "web",
            vec![
                PluginDefinition::new("first").on_run_on_repo(spy("first", &log)),
                PluginDefinition::new("broken").on_run_on_repo(failing("broken", &log)),
                PluginDefinition::new("last").on_run_on_repo(spy("last", &log)),
            ],
            &["org/a", "org/b"],
        );
        let status = StatusRecorder::new();

        let err = sync_target(&target, &EnvData::default(), &status).await.unwrap_err();

        assert_eq!(err.to_string(), "plugin \"broken\" failed on repo \"org/a\": broken exploded");
        assert_eq!(*log.lock().unwrap(), vec!["first@org/a", "broken@org/a"]);
        assert_eq!(status.steps().last(), Some(&SyncStep::RunOnRepo));
    }

    #[tokio::test]
    async fn hooks_see_their_settings_and_env() {
        struct Inspect {
            seen: Arc<Mutex<Vec<String>>>,
        }

        #[async_trait]
        impl PluginHook for Inspect {
            async fn call(&self, ctx: RunContext<'_>) -> anyhow::Result<()> {
                let region = ctx
                    .settings
                    .and_then(|settings| settings.lookup("region"))
                    .cloned();
                self.seen.lock().unwrap().push(format!(
                    "{}|{:?}|{:?}|{}",
                    ctx.config.display_name(),
                    region,
                    ctx.env.secret("token"),
                    ctx.env.dry_run
                ));
                Ok(())
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut target = target(
            "web",
            vec![PluginDefinition::new("deploy").on_run(Inspect {
                seen: Arc::clone(&seen),
            })],
            &[],
        );
        target.config.settings.insert(
            "deploy".into(),
            PluginSettings::from_layers(vec![json!({ "region": "us" }), json!({ "region": "eu" })]),
        );
        let mut env = env_with(&[("token", "t")]);
        env.dry_run = true;

        sync_target(&target, &env, &NoopStatus).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![r#"web|Some(String("eu"))|Some("t")|true"#]);
    }

    #[tokio::test]
    async fn plugin_hooks_can_report_progress() {
        struct Chatty;

        #[async_trait]
        impl PluginHook for Chatty {
            async fn call(&self, ctx: RunContext<'_>) -> anyhow::Result<()> {
                ctx.status
                    .on_status(StatusEvent::new(
                        SyncStep::Plugin("upload".into()),
                        "uploading",
                        StatusData::default().with_plugin("chatty"),
                    ))
                    .await;
                Ok(())
            }
        }

        let target = target("web", vec![PluginDefinition::new("chatty").on_run(Chatty)], &[]);
        let status = StatusRecorder::new();

        sync_target(&target, &EnvData::default(), &status).await.unwrap();

        assert_eq!(status.steps()[..4], [
            SyncStep::GlobalStart,
            SyncStep::Run,
            SyncStep::Plugin("upload".into()),
            SyncStep::RunComplete,
        ]);
    }

    #[tokio::test]
    async fn slow_status_callback_is_awaited_before_the_hook_runs() {
        /// Sleeps on every `run` event before logging it.
        struct SlowStatus {
            log: Log,
        }

        #[async_trait]
        impl StatusCallback for SlowStatus {
            async fn on_status(&self, event: StatusEvent) {
                if event.step == SyncStep::Run {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    self.log.lock().unwrap().push(format!("status:{}", event.message));
                }
            }
        }

        let log = Log::default();
        let target = target("web", vec![PluginDefinition::new("build").on_run(spy("build", &log))], &[]);

        sync_target(&target, &EnvData::default(), &SlowStatus { log: Arc::clone(&log) })
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["status:Running build globally...", "build"]);
    }

    #[tokio::test]
    async fn sibling_failures_do_not_cancel_other_targets() {
        struct Slow {
            log: Log,
        }

        #[async_trait]
        impl PluginHook for Slow {
            async fn call(&self, _ctx: RunContext<'_>) -> anyhow::Result<()> {
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.log.lock().unwrap().push("slow done".into());
                Ok(())
            }
        }

        let log = Log::default();
        let targets = vec![
            target("broken", vec![PluginDefinition::new("boom").on_run(failing("boom", &log))], &[]),
            target("slow", vec![PluginDefinition::new("slow").on_run(Slow { log: Arc::clone(&log) })], &[]),
            target("also-broken", vec![PluginDefinition::new("bang").on_run(failing("bang", &log))], &[]),
        ];

        let err = sync_all(&targets, &EnvData::default(), &StatusRecorder::new())
            .await
            .unwrap_err();

        let Error::TargetsFailed { failures } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(failures.len(), 2);
        assert!(err.to_string().starts_with("2 targets failed: target \"broken\""), "{err}");
        assert!(log.lock().unwrap().contains(&"slow done".to_string()));
    }

    #[tokio::test]
    async fn empty_plugin_set_still_reports_progress() {
        let target = SyncTarget {
            name: None,
            repos: vec!["org/a".into()],
            plugins: ResolvedPluginSet::default(),
            secrets: SecretNeeds::new(),
            config: ResolvedConfig::default(),
        };
        let status = StatusRecorder::new();

        sync_all(std::slice::from_ref(&target), &EnvData::default(), &status)
            .await
            .unwrap();

        assert_eq!(status.steps(), vec![
            SyncStep::GlobalStart,
            SyncStep::GlobalDone,
            SyncStep::ReposStart,
            SyncStep::ReposDone,
        ]);
        assert_eq!(status.events()[0].data.target, None);
    }
}
