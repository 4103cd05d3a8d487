//! The interactive `rabbit setup` flow and the provider reachability check.

use std::fmt::Display;
use std::future::poll_fn;
use std::io::{BufRead, Write};
use std::pin::pin;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rabbit_model::{ModelProvider, ModelRequest, ModelResponse};
use tokio::time;

use crate::config::{Config, Provider};

/// Asks the user for the settings, starting from `current`.
///
/// An empty answer keeps the value shown in brackets.
pub fn run_setup(
    current: Config,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Config> {
    let mut config = current;
    let mut prompt = Prompt { input, output };

    let names: Vec<_> = Provider::ALL.iter().map(|p| p.name()).collect();
    let provider: Provider = prompt.ask_parsed(
        &format!("LLM provider ({})", names.join("/")),
        config.llm.provider.name(),
    )?;
    if provider != config.llm.provider {
        // The old model and endpoint belong to the previous provider.
        config.llm.model = None;
        config.llm.base_url = None;
    }
    config.llm.provider = provider;

    if provider.needs_api_key() {
        let shown = match config.llm.api_key {
            Some(_) => "keep current",
            None => "",
        };
        loop {
            let api_key = prompt.ask("API key", shown)?;
            if api_key != shown {
                config.llm.api_key = Some(api_key);
                break;
            }
            if config.llm.api_key.is_some() {
                break;
            }
            prompt.say(format_args!(
                "An API key is required for {}.",
                provider.name()
            ))?;
        }
    } else {
        config.llm.api_key = None;
    }

    let model = prompt.ask("Model", config.model())?;
    config.llm.model = (model != provider.default_model()).then_some(model);

    config.llm.timeout_seconds = prompt.ask_parsed(
        "LLM timeout in seconds",
        &config.llm.timeout_seconds.to_string(),
    )?;
    config.safety.timeout_seconds = prompt.ask_parsed(
        "Command timeout in seconds",
        &config.safety.timeout_seconds.to_string(),
    )?;
    Ok(config)
}

struct Prompt<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<R: BufRead, W: Write> Prompt<'_, R, W> {
    fn ask(&mut self, question: &str, default: &str) -> Result<String> {
        if default.is_empty() {
            write!(self.output, "{question}: ")?;
        } else {
            write!(self.output, "{question} [{default}]: ")?;
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("setup aborted");
        }
        let answer = match line.trim() {
            "" => default,
            answer => answer,
        };
        Ok(answer.to_owned())
    }

    fn ask_parsed<T>(&mut self, question: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        loop {
            let answer = self.ask(question, default)?;
            match answer.parse() {
                Ok(value) => return Ok(value),
                Err(err) => self.say(format_args!("Invalid value: {err}"))?,
            }
        }
    }

    fn say(&mut self, message: impl Display) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }
}

/// Sends a short request and waits for the first event of its response.
pub async fn check_availability<P: ModelProvider>(
    provider: &P,
    timeout: Duration,
) -> Result<()> {
    let req = ModelRequest::with_prompt("Hello");
    let check = async {
        let resp = provider.send_request(&req).await?;
        let mut resp = pin!(resp);
        poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?;
        Ok::<_, P::Error>(())
    };
    time::timeout(timeout, check)
        .await
        .with_context(|| {
            format!("no response within {} seconds", timeout.as_secs())
        })??;
    Ok(())
}
