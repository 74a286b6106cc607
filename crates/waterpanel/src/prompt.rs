//! Interactive prompts for the supervisor, backed by dialoguer.
//!
//! dialoguer blocks on the terminal, so every prompt runs on the blocking
//! pool and the supervisor's async loop stays responsive to Ctrl-C.

use dialoguer::{Input, Select};

use waterpanel_core::{ConnectionConfig, Notice, Prompter, Transport};

use crate::output;

const CHOICES: [Transport; 2] = [Transport::Mqtt, Transport::Rest];

pub struct TerminalPrompter {
    color: bool,
}

impl TerminalPrompter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl Prompter for TerminalPrompter {
    async fn choose_transport(&mut self, current: &ConnectionConfig) -> Option<Transport> {
        let default = CHOICES
            .iter()
            .position(|t| *t == current.transport)
            .unwrap_or(0);

        let picked = tokio::task::spawn_blocking(move || {
            let labels = CHOICES.map(Transport::label);
            Select::new()
                .with_prompt("Connect via (Esc to quit)")
                .items(&labels)
                .default(default)
                .interact_opt()
        })
        .await;

        match picked {
            Ok(Ok(choice)) => choice.and_then(|i| CHOICES.get(i).copied()),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "transport prompt failed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport prompt task failed");
                None
            }
        }
    }

    async fn prompt_host(&mut self, transport: Transport, current: &str) -> Option<String> {
        let initial = current.to_owned();
        let prompt = match transport {
            Transport::Mqtt => "Broker address (127.0.0.1 or localhost)",
            Transport::Rest => "REST API host or IP",
        };

        let answered = tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(prompt)
                .with_initial_text(initial)
                .allow_empty(true)
                .interact_text()
        })
        .await;

        match answered {
            Ok(Ok(host)) => Some(host),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "host prompt dismissed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "host prompt task failed");
                None
            }
        }
    }

    async fn notify(&mut self, notice: Notice) {
        output::print_notice(&notice, self.color);
    }
}
