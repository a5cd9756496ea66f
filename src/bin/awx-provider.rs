use anyhow::{anyhow, bail, Context};
use awx_provider::provider::{self, Response};
use awx_provider::lookup::Selector;
use awx_provider::{logging, Provider, ProviderConfig};
use std::env;

const USAGE: &str = "usage: awx-provider check
       awx-provider schema
       awx-provider read TYPE ID
       awx-provider import TYPE ID
       awx-provider lookup DATA_SOURCE NAME|ID
       awx-provider delete TYPE ID";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().ok_or(anyhow!(
        "awx-provider requires a command, but none was provided\n{USAGE}"
    ))?;

    if command == "schema" {
        print!("{}", serde_yaml::to_string(&provider::schema())?);
        return Ok(());
    }

    let config =
        ProviderConfig::load_default().context("could not load the provider configuration")?;
    let provider = Provider::configure(&config)
        .await
        .map_err(|e| anyhow!("{}", e.to_diagnostic()))?;

    let response = match (command.as_str(), &args[1..]) {
        ("check", []) => {
            println!("authenticated to {} as {}", config.hostname, config.username);
            return Ok(());
        }
        ("read", [type_name, id]) => provider.read(type_name, id).await,
        ("import", [type_name, raw]) => provider.import(type_name, raw).await,
        ("lookup", [data_source, key]) => {
            let selector = Selector::parse(key).to_desired();
            provider.read_data_source(data_source, &selector).await
        }
        ("delete", [type_name, id]) => provider.delete(type_name, id).await,
        _ => bail!("unrecognized command line: {}\n{USAGE}", args.join(" ")),
    };

    print!("{}", serde_yaml::to_string(&response)?);
    fail_on_error(&response)
}

fn fail_on_error(response: &Response) -> anyhow::Result<()> {
    match response.diagnostics.iter().find(|d| d.is_error()) {
        Some(error) => bail!("{error}"),
        None => Ok(()),
    }
}
