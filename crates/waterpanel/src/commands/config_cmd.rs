//! Config subcommand handlers.

use waterpanel_core::ConnectionConfig;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;

const REDACTED: &str = "********";

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut store = super::open_store(global);

    match args.command {
        ConfigCommand::Show => {
            let config = store.load();
            match global.output {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&describe(&config))?);
                }
                OutputFormat::Text => {
                    for (key, value) in describe_lines(&config) {
                        println!("{key:<24} {value}");
                    }
                }
            }
        }
        ConfigCommand::Path => {
            println!("config: {}", store.path().display());
            println!("state:  {}", store.state_path().display());
        }
        ConfigCommand::Reset => {
            if store.reset()? {
                eprintln!("Removed {}", store.state_path().display());
            } else {
                eprintln!("Nothing saved at {}", store.state_path().display());
            }
        }
    }
    Ok(())
}

fn describe_lines(config: &ConnectionConfig) -> Vec<(&'static str, String)> {
    let ms = |d: std::time::Duration| d.as_millis().to_string();
    vec![
        ("transport", config.transport.to_string()),
        ("host", config.host.clone()),
        ("mqtt_port", config.mqtt_port.to_string()),
        ("mqtt_username", config.mqtt_username.clone()),
        ("mqtt_password", REDACTED.into()),
        ("mqtt_tls", config.mqtt_tls.to_string()),
        ("mqtt_topic", config.mqtt_topic.clone()),
        ("mqtt_label", config.mqtt_label.clone()),
        ("mqtt_reconnect_ms", ms(config.mqtt_reconnect)),
        ("mqtt_connect_timeout_ms", ms(config.mqtt_connect_timeout)),
        ("rest_endpoint", config.rest_endpoint.clone()),
        ("rest_username", config.rest_username.clone()),
        ("rest_password", REDACTED.into()),
        ("display_tag", config.display_tag.clone()),
        ("tag_names", config.tag_names.join(",")),
        ("poll_interval_ms", ms(config.poll_interval)),
        ("request_timeout_ms", ms(config.request_timeout)),
        ("no_data_threshold", config.no_data_threshold.to_string()),
    ]
}

fn describe(config: &ConnectionConfig) -> serde_json::Value {
    let map = describe_lines(config)
        .into_iter()
        .map(|(key, value)| (key.to_owned(), serde_json::Value::String(value)))
        .collect();
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_are_redacted() {
        let lines = describe_lines(&ConnectionConfig::default());
        for key in ["mqtt_password", "rest_password"] {
            let (_, value) = lines.iter().find(|(k, _)| *k == key).unwrap();
            assert_eq!(value, REDACTED);
        }
    }

    #[test]
    fn json_view_has_every_key() {
        let value = describe(&ConnectionConfig::default());
        assert_eq!(value["host"], "127.0.0.1");
        assert_eq!(value["poll_interval_ms"], "5000");
        assert_eq!(value["rest_password"], REDACTED);
    }
}
