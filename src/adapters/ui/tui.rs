//! Implements InputPort. Inquire-based operator console.
//!
//! Collects recipients and message text, runs a dispatch behind a spinner and
//! prints per-recipient outcomes. Ctrl-C during a dispatch cancels it.

use crate::domain::{DeliveryOutcome, DispatchSummary, DomainError, Recipient};
use crate::ports::InputPort;
use crate::usecases::{NotificationService, PhoneNormalizer};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::error::InquireError;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, Select, Text};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Applies the console theme to every inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("?").with_fg(Color::LightGreen))
        .with_highlighted_option_prefix(Styled::new(">").with_fg(Color::LightCyan))
        .with_canceled_prompt_indicator(Styled::new("<skipped>").with_fg(Color::DarkGrey));
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    SendMessage,
    CreateGroup,
    AddMember,
    CheckNumber,
    Quit,
}

impl MenuAction {
    const ALL: [MenuAction; 5] = [
        MenuAction::SendMessage,
        MenuAction::CreateGroup,
        MenuAction::AddMember,
        MenuAction::CheckNumber,
        MenuAction::Quit,
    ];
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuAction::SendMessage => "Send personal message to members",
            MenuAction::CreateGroup => "Create group & notify members",
            MenuAction::AddMember => "Add member to existing group",
            MenuAction::CheckNumber => "Check a phone number",
            MenuAction::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// Esc / Ctrl-C on a prompt means "back", not an error.
fn is_abort(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

fn console_err(e: InquireError) -> DomainError {
    DomainError::Console(e.to_string())
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    service: Arc<NotificationService>,
    normalizer: Arc<PhoneNormalizer>,
}

impl TuiInputPort {
    pub fn new(service: Arc<NotificationService>, normalizer: Arc<PhoneNormalizer>) -> Self {
        Self {
            service,
            normalizer,
        }
    }

    /// Prompt for recipients until an empty name is entered.
    fn prompt_members(&self) -> Result<Vec<Recipient>, InquireError> {
        let mut members = Vec::new();
        loop {
            let name = Text::new(&format!("Member #{} name (empty to finish):", members.len() + 1))
                .prompt()?;
            let name = name.trim();
            if name.is_empty() {
                break;
            }
            let phone = Text::new("Phone number (empty if unknown):")
                .with_help_message("e.g. 0300 1234567 or +92 300 1234567")
                .prompt()?;
            let phone = phone.trim();
            members.push(Recipient::new(
                (members.len() + 1).to_string(),
                name,
                (!phone.is_empty()).then(|| phone.to_string()),
            ));
        }
        Ok(members)
    }

    fn prompt_member(&self) -> Result<Recipient, InquireError> {
        let name = Text::new("Member name:").prompt()?;
        let phone = Text::new("Phone number:").prompt()?;
        let phone = phone.trim();
        Ok(Recipient::new(
            "1",
            name.trim(),
            (!phone.is_empty()).then(|| phone.to_string()),
        ))
    }

    async fn send_message(&self) -> Result<(), InquireError> {
        let members = self.prompt_members()?;
        if members.is_empty() {
            println!("No members entered.");
            return Ok(());
        }
        let text = Text::new("Message ({name} is replaced per member):").prompt()?;
        let summary = with_cancellation("Sending messages", |cancel| async move {
            self.service
                .notify_members(&members, &text.as_str().into(), &cancel)
                .await
        })
        .await;
        print_summary(&summary);
        Ok(())
    }

    async fn create_group(&self) -> Result<(), InquireError> {
        let group_name = Text::new("Group name:").prompt()?;
        let members = self.prompt_members()?;
        let text = Text::new("Message:")
            .with_default("Hi {name}, you have been added to {group_name}. Join here: {invite_link}")
            .prompt()?;
        let report = with_cancellation("Creating group", |cancel| async move {
            self.service
                .create_group_and_notify(group_name.trim(), &members, &text.as_str().into(), &cancel)
                .await
        })
        .await;

        println!("Flow: {}", report.state);
        if let Some(group) = &report.group {
            println!("Group id: {}", group.provider_group_id);
            match &group.invite_link {
                Some(link) => println!("Invite link: {}", link),
                None => println!("Invite link: unavailable"),
            }
        }
        print_summary(&report.members);
        Ok(())
    }

    async fn add_member(&self) -> Result<(), InquireError> {
        let group_id = Text::new("Provider group id:").prompt()?;
        let member = self.prompt_member()?;
        let outcome = with_cancellation("Adding member", |cancel| async move {
            self.service.add_member(group_id.trim(), &member, &cancel).await
        })
        .await;
        println!("{}", describe(&outcome));
        Ok(())
    }

    fn check_number(&self) -> Result<(), InquireError> {
        let raw = Text::new("Phone number:").prompt()?;
        let region = &self.service.settings().default_region;
        match self.normalizer.normalize(&raw, region) {
            Ok(phone) => println!("OK  {}", phone),
            Err(e) => println!("NO  {}", e),
        }
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let action = match Select::new("What do you want to do?", MenuAction::ALL.to_vec()).prompt() {
                Ok(action) => action,
                Err(e) if is_abort(&e) => MenuAction::Quit,
                Err(e) => return Err(console_err(e)),
            };
            info!(action = %action, "menu selection");

            let result = match action {
                MenuAction::SendMessage => self.send_message().await,
                MenuAction::CreateGroup => self.create_group().await,
                MenuAction::AddMember => self.add_member().await,
                MenuAction::CheckNumber => self.check_number(),
                MenuAction::Quit => {
                    let quit = Confirm::new("Quit?").with_default(true).prompt();
                    match quit {
                        Ok(false) => continue,
                        Ok(true) => return Ok(()),
                        Err(e) if is_abort(&e) => return Ok(()),
                        Err(e) => return Err(console_err(e)),
                    }
                }
            };
            match result {
                Ok(()) => {}
                Err(e) if is_abort(&e) => println!("Back to menu."),
                Err(e) => return Err(console_err(e)),
            }
        }
    }
}

/// Run `work` behind a spinner. Ctrl-C cancels the token handed to it.
async fn with_cancellation<F, Fut, T>(label: &str, work: F) -> T
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => watcher.cancel(),
            _ = watcher.cancelled() => {}
        }
    });
    let _guard = cancel.clone().drop_guard();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("{} (Ctrl-C to cancel)", label));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = work(cancel).await;
    spinner.finish_and_clear();
    result
}

fn describe(outcome: &DeliveryOutcome) -> String {
    match outcome {
        DeliveryOutcome::Success { ack } => format!("sent ({})", ack.id()),
        DeliveryOutcome::Rejected { reason } => format!("rejected: {}", reason),
        DeliveryOutcome::TransientFailure { reason } => format!("failed, retry later: {}", reason),
        DeliveryOutcome::SkippedNoPhone => "skipped: no usable phone number".to_string(),
    }
}

fn print_summary(summary: &DispatchSummary) {
    for entry in summary.outcomes() {
        let phone = entry
            .phone
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:<16} {}",
            entry.display_name,
            phone,
            describe(&entry.outcome)
        );
    }
    println!(
        "Sent {} | Rejected {} | Failed {} | Skipped {} (of {})",
        summary.succeeded(),
        summary.rejected(),
        summary.transient_failures(),
        summary.skipped_no_phone(),
        summary.total()
    );
}
