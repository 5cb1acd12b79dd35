//! Subcommand implementations
//!
//! Each invocation is a short-lived workflow: state lives only for the
//! duration of the command, the session persists between runs.

use crate::config::AppConfig;
use anyhow::{bail, Context, Result};
use reframe_backend::{FileCapture, JpegPreprocessor, SessionStore};
use reframe_core::{FeedEntry, TransformationWorkflow, WorkflowError};
use reframe_model::{PhotoSlot, Transformation, TransformationId, UserId};
use reframe_supabase::SupabaseClient;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) struct App {
    config: AppConfig,
    client: SupabaseClient,
    json: bool,
}

impl App {
    pub(crate) fn new(config: AppConfig, json: bool) -> Result<Self> {
        let session = match config.session_path() {
            Some(path) => SessionStore::persistent(path),
            None => SessionStore::in_memory(),
        };
        let client = SupabaseClient::new(config.supabase.clone(), Arc::new(session))
            .context("configuring backend client")?;
        Ok(Self { config, client, json })
    }

    pub(crate) async fn sign_up(&self, email: &str, password: &str) -> Result<()> {
        let outcome = self.client.auth().sign_up(email, password).await?;
        let confirmed = outcome.session.is_some();
        self.emit(&outcome.user, || {
            if confirmed {
                println!("Signed up and signed in as {}", outcome.user.display_name());
            } else {
                println!("Check {email} for a confirmation link, then log in");
            }
        })
    }

    pub(crate) async fn login(&self, email: &str, password: &str) -> Result<()> {
        let session = self.client.auth().sign_in_with_password(email, password).await?;
        self.emit(&session.user, || {
            println!("Signed in as {}", session.user.display_name());
        })
    }

    pub(crate) async fn logout(&self) -> Result<()> {
        self.client.auth().sign_out().await?;
        if !self.json {
            println!("Signed out");
        }
        Ok(())
    }

    pub(crate) async fn reset_password(&self, email: &str) -> Result<()> {
        self.client.auth().reset_password(email).await?;
        if !self.json {
            println!("Password reset email sent to {email}");
        }
        Ok(())
    }

    pub(crate) fn oauth_url(&self, provider: &str, redirect_to: &str) -> Result<()> {
        let url = self.client.auth().oauth_url(provider, redirect_to)?;
        self.emit(&url.as_str(), || println!("{url}"))
    }

    pub(crate) async fn oauth_callback(&self, callback_url: &str) -> Result<()> {
        let session = self.client.auth().complete_oauth(callback_url).await?;
        self.emit(&session.user, || {
            println!("Signed in as {}", session.user.display_name());
        })
    }

    pub(crate) async fn init_storage(&self) -> Result<()> {
        let created = self.client.storage().ensure_bucket().await?;
        let bucket = &self.config.supabase.bucket;
        self.emit(&created, || {
            if created {
                println!("Created bucket {bucket}");
            } else {
                println!("Bucket {bucket} already exists");
            }
        })
    }

    /// Start a transformation from a before photo
    pub(crate) async fn capture(&self, photo: PathBuf) -> Result<()> {
        let workflow = self
            .workflow(FileCapture::new().with_file(PhotoSlot::Before, photo))
            .await;
        take_photo(&workflow, PhotoSlot::Before).await?;
        let draft = submit(&workflow).await?;
        self.emit(&draft, || println!("Saved draft {}", draft.id))
    }

    /// Finish a draft with its after photo
    pub(crate) async fn complete(&self, draft: &str, photo: PathBuf) -> Result<()> {
        let workflow = self
            .workflow(FileCapture::new().with_file(PhotoSlot::After, photo))
            .await;
        workflow
            .resume_draft(&TransformationId::new(draft))
            .await
            .map_err(explain)?;
        take_photo(&workflow, PhotoSlot::After).await?;
        let complete = submit(&workflow).await?;
        self.emit(&complete, || println!("Completed {}", complete.id))
    }

    pub(crate) async fn drafts(&self) -> Result<()> {
        let workflow = self.workflow(FileCapture::new()).await;
        let drafts = workflow.list_drafts().await.map_err(explain)?;
        self.emit(&drafts, || {
            if drafts.is_empty() {
                println!("No drafts");
            }
            for draft in &drafts {
                println!("{}", describe(draft));
            }
        })
    }

    pub(crate) async fn feed(&self, user: Option<&str>) -> Result<()> {
        let workflow = self.workflow(FileCapture::new()).await;
        let entries = match user {
            Some(user) => workflow.list_completed_by(&UserId::new(user)).await,
            None => workflow.list_completed().await,
        }
        .map_err(explain)?;
        self.emit(&entries, || {
            if entries.is_empty() {
                println!("Nothing here yet");
            }
            for entry in &entries {
                println!("{}", describe_entry(entry));
            }
        })
    }

    pub(crate) async fn profile(&self) -> Result<()> {
        let workflow = self.workflow(FileCapture::new()).await;
        let profile = workflow.profile().await.map_err(explain)?;
        self.emit(&profile, || {
            println!("{}", profile.author.name);
            if let Some(email) = &profile.user.email {
                println!("{email}");
            }
            println!(
                "{} transformations ({} completed, {} drafts)",
                profile.total,
                profile.completed,
                profile.drafts()
            );
            for record in &profile.transformations {
                println!("{}", describe(record));
            }
        })
    }

    pub(crate) async fn show(&self, id: &str) -> Result<()> {
        let workflow = self.workflow(FileCapture::new()).await;
        let record = workflow
            .transformation(&TransformationId::new(id))
            .await
            .map_err(explain)?;
        self.emit(&record, || println!("{}", describe(&record)))
    }

    pub(crate) async fn delete(&self, draft: &str) -> Result<()> {
        let workflow = self.workflow(FileCapture::new()).await;
        let existed = workflow
            .delete_draft(&TransformationId::new(draft))
            .await
            .map_err(explain)?;
        self.emit(&existed, || {
            if existed {
                println!("Deleted {draft}");
            } else {
                println!("{draft} was already gone");
            }
        })
    }

    async fn workflow(&self, capture: FileCapture) -> TransformationWorkflow {
        let now = chrono::Utc::now().timestamp();
        if let Err(e) = self.client.auth().ensure_fresh(now).await {
            tracing::warn!(error = %e, "could not refresh expired session");
        }

        let backend = self
            .client
            .backend()
            .with_capture(Arc::new(capture))
            .with_preprocessor(Arc::new(JpegPreprocessor::new(self.config.preprocess.clone())));
        TransformationWorkflow::new(backend, self.config.workflow.clone())
    }

    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

async fn take_photo(workflow: &TransformationWorkflow, slot: PhotoSlot) -> Result<()> {
    match workflow.capture(slot).await.map_err(explain)? {
        Some(_) => Ok(()),
        None => bail!("no {slot} photo was captured"),
    }
}

/// Submit, reclaiming any orphaned upload before the process exits
async fn submit(workflow: &TransformationWorkflow) -> Result<Transformation> {
    match workflow.submit_captured_photo().await {
        Ok(record) => Ok(record),
        Err(err) => {
            if err.is_orphan() {
                let report = workflow.sweep_orphans().await;
                tracing::info!(
                    reclaimed = report.reclaimed.len(),
                    failed = report.failed.len(),
                    "swept orphaned uploads"
                );
                for (url, e) in &report.failed {
                    tracing::warn!(%url, error = %e, "orphaned photo left in storage");
                }
            }
            Err(explain(err))
        }
    }
}

fn explain(err: WorkflowError) -> anyhow::Error {
    if err.requires_auth() {
        anyhow::Error::new(err).context("sign in first with `reframe login` or `reframe oauth-url`")
    } else {
        err.into()
    }
}

fn describe(record: &Transformation) -> String {
    let after = record
        .after_photo_url
        .as_ref()
        .map_or("-", |url| url.as_str());
    format!(
        "{}  {:<8}  {}  before={}  after={}",
        record.id,
        record.completion().as_str(),
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.before_photo_url,
        after
    )
}

fn describe_entry(entry: &FeedEntry) -> String {
    let you = if entry.author.is_current_user { " (you)" } else { "" };
    format!("{}  by {}{you}", describe(&entry.transformation), entry.author.name)
}
