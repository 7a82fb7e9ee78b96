//! Chartwise command implementations

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use chartwise_agent::{AgentLoop, Outcome, ToolName, ToolRegistry};
use chartwise_config::{self, Backend, Config};
use chartwise_provider::build_provider;
use chartwise_superset::{NewDatabase, SupersetClient};

/// Read a trimmed line from stdin; `None` at end of input
fn read_line() -> Result<Option<String>> {
    let mut input = String::new();
    let read = std::io::stdin().read_line(&mut input)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Read password from stdin (masked input)
fn read_password() -> Result<String> {
    match rpassword::read_password() {
        Ok(password) => Ok(password),
        Err(_) => Ok(read_line()?.unwrap_or_default()),
    }
}

async fn load_config() -> Result<Config> {
    let config = Config::load()
        .await
        .context("Failed to load ~/.chartwise/config.json")?;
    config.validate()?;
    Ok(config)
}

/// Build the Superset client, logging in when a username is configured
async fn connect(config: &Config) -> Result<SupersetClient> {
    let client = SupersetClient::from_config(&config.superset)
        .context("Failed to create Superset client")?;

    let username = &config.superset.username;
    if username.is_empty() {
        warn!("No Superset username configured, calling the API without logging in");
        return Ok(client);
    }

    let password = if config.superset.password.is_empty() {
        eprint!("Superset password for {}: ", username);
        std::io::stderr().flush()?;
        read_password()?
    } else {
        config.superset.password.clone()
    };

    client
        .authenticate(username, &password)
        .await
        .with_context(|| format!("Failed to log in to Superset at {}", client.base_url()))?;
    info!("Logged in to Superset as {}", username);

    Ok(client)
}

/// Initialize config
pub async fn init_command() -> Result<()> {
    println!("Initializing Chartwise...");

    let config = chartwise_config::init().await?;

    println!("\nConfig: {}", chartwise_config::config_path().display());
    println!("\nNext steps:");
    println!(
        "  1. Point superset.base_url at your Superset (now {})",
        config.superset_url()
    );
    println!("     and set superset.username / superset.password");
    println!("  2. Check the model backend: {} ({})", config.model.backend, config.model.name);
    println!("  3. Ask a question: chartwise ask -m \"Show me sales by region\"");

    Ok(())
}

/// Ask the agent, once or interactively
pub async fn ask_command(message: Option<String>) -> Result<()> {
    let config = load_config().await?;
    let client = connect(&config).await?;
    let provider =
        build_provider(&config.model).context("Failed to set up the language model backend")?;

    let tools = ToolRegistry::new(Arc::new(client));
    let mut agent = AgentLoop::from_config(provider, tools, &config);

    if let Some(msg) = message {
        let reply = agent.run(&msg).await;
        if reply.outcome != Outcome::Answer {
            warn!("Query ended with {:?} after {} rounds", reply.outcome, reply.rounds);
        }
        println!("{}", reply.text);
        return Ok(());
    }

    println!("Interactive mode (type 'exit' to quit)");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let input = match read_line()? {
            Some(input) => input,
            None => break,
        };
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        let reply = agent.run(&input).await;
        println!("\n{}\n", reply.text);
    }

    Ok(())
}

/// Print the tool catalogue
pub fn tools_command() {
    for tool in ToolName::ALL {
        let required = tool.required_args();
        println!("{}", tool);
        println!("    {}", tool.description());
        if required.is_empty() {
            println!("    required: none");
        } else {
            println!("    required: {}", required.join(", "));
        }
    }
}

/// Run one tool through the agent's dispatch path
pub async fn call_command(tool: String, args: String) -> Result<()> {
    let name: ToolName = tool.parse()?;
    let args: Value =
        serde_json::from_str(&args).with_context(|| format!("--args is not valid JSON: {}", args))?;

    let config = load_config().await?;
    let client = connect(&config).await?;
    let registry = ToolRegistry::new(Arc::new(client));

    let result = registry.dispatch(name.as_str(), args).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(error) = result.get("error") {
        anyhow::bail!("{} returned an error: {}", name, error);
    }
    Ok(())
}

/// Register a database connection
pub async fn register_db_command(name: String, uri: String, engine: Option<String>) -> Result<()> {
    let config = load_config().await?;
    let client = connect(&config).await?;

    let created = client
        .create_database(&NewDatabase {
            database_name: name.clone(),
            sqlalchemy_uri: uri,
            engine,
        })
        .await
        .with_context(|| format!("Failed to register database {}", name))?;

    match created["id"].as_i64() {
        Some(id) => println!("Registered database {} (id {})", name, id),
        None => println!("Registered database {}", name),
    }
    Ok(())
}

/// Show status
pub async fn status_command() -> Result<()> {
    let config_path = chartwise_config::config_path();

    println!("Chartwise Status");
    println!("----------------");
    println!(
        "Config:     {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load().await?;
    println!("Superset:   {}", config.superset_url());
    println!(
        "User:       {}",
        if config.superset.username.is_empty() {
            "[Not set]"
        } else {
            config.superset.username.as_str()
        }
    );
    println!(
        "Password:   {}",
        if config.superset.password.is_empty() {
            "[Not set]"
        } else {
            "[Set]"
        }
    );
    println!("Backend:    {}", config.model.backend);
    println!("Model:      {}", config.model.name);
    if let Some(api_base) = &config.model.api_base {
        println!("Model API:  {}", api_base);
    }
    if config.model.backend == Backend::Openai {
        println!(
            "API Key:    {}",
            if config.model.api_key.is_empty() {
                "[Missing]"
            } else {
                "[Set]"
            }
        );
    }
    println!("Max rounds: {}", config.max_rounds());

    if let Err(e) = config.validate() {
        println!("\n{}", e);
    } else {
        println!("\nReady");
    }

    Ok(())
}
