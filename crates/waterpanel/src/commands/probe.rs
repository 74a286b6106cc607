//! `waterpanel probe`: one REST read, classified, then exit.

use waterpanel_core::source;
use waterpanel_core::{ConnectionAttemptResult, ConnectionConfig, CoreError, Transport};

use crate::cli::{GlobalOpts, ProbeArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: ProbeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = super::open_store(global).load();
    if let Some(host) = args.host {
        config = config.with_choice(Transport::Rest, &host);
    }
    if let Some(endpoint) = args.endpoint {
        config.rest_endpoint = endpoint;
    }
    if let Some(tag) = args.tag {
        config.display_tag = tag;
    }

    if let Err(CoreError::UserCancelled) = ConnectionConfig::check_host(Transport::Rest, &config.host)
    {
        return Err(CliError::Validation {
            field: "host".into(),
            reason: "host must not be empty".into(),
        });
    }

    let client = config.tag_client()?;
    tracing::debug!(url = %client.url(), tag = %config.display_tag, "probing");

    match source::probe(&client, &config.display_tag).await {
        ConnectionAttemptResult::Succeeded(reading) => {
            let color = output::should_color(global.color);
            println!("{}", output::render_reading(&reading, global.output, color));
            Ok(())
        }
        ConnectionAttemptResult::FailedTransport(e) | ConnectionAttemptResult::FailedNoData(e) => {
            Err(e.into())
        }
    }
}
