use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::cache::token::Token;
use crate::config::broker::BrokerConfig;
use crate::errors::{BrokerError, MintError, Result};
use crate::helpers::time::{now, saturating_add, to_chrono};
use crate::minting::invocation::{build_invocation, validate_executable, InvocationSpec};
use crate::observability::metrics::get_metrics;
use crate::profile::{ParameterSet, IDENTITY_FIELD};

/// Upper bound on captured stdout/stderr.
const MAX_OUTPUT_BYTES: u64 = 1024 * 1024;
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Output of a finished tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Mint a new token for `profile_name` by running the external tool.
///
/// The token is owned by the parameter set's identity and trusted for
/// `config.mint_validity` from now; the tool's own output is never inspected
/// for an expiry.
pub fn mint(profile_name: &str, params: &ParameterSet, config: &BrokerConfig) -> Result<Token> {
    let access_id = params
        .identity()
        .ok_or_else(|| BrokerError::InvalidProfile {
            name: profile_name.to_owned(),
            reason: format!("missing '{IDENTITY_FIELD}'"),
        })?
        .to_owned();

    let spec = build_invocation(&config.cli_path, params);
    validate_executable(&spec.program)?;

    let metrics = get_metrics();
    metrics.mint_attempts.inc();
    info!(profile = profile_name, program = %spec.program.display(), args = %spec.redacted(), "minting token");

    let start = Instant::now();
    let result = run_tool(&spec, config.mint_timeout).and_then(into_token_value);
    metrics.mint_duration.observe(start.elapsed().as_secs_f64());

    let value = result.map_err(|source| {
        error!(profile = profile_name, reason = source.reason(), error = %source, "mint failed");
        metrics.mint_failures.with_label_values(&[source.reason()]).inc();
        BrokerError::MintFailed {
            profile: profile_name.to_owned(),
            source,
        }
    })?;

    let expiry = saturating_add(now(), to_chrono(config.mint_validity));
    info!(profile = profile_name, access_id = %access_id, %expiry, "token minted");
    Ok(Token::new(access_id, value, expiry))
}

/// Run the tool to completion, killing it once `timeout` elapses.
pub fn run_tool(spec: &InvocationSpec, timeout: Duration) -> std::result::Result<ToolOutput, MintError> {
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| MintError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

    // both pipes drained concurrently so a chatty stderr cannot stall stdout
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let deadline = Instant::now().checked_add(timeout);
    let Some(status) = wait_with_deadline(&mut child, deadline)? else {
        let _ = child.kill();
        let _ = child.wait();
        // readers are left detached: a grandchild may still hold the pipes
        return Err(MintError::Timeout(timeout));
    };

    // a background grandchild can keep the pipes open after the tool exits
    let stdout = collect(&stdout_reader, deadline, timeout)?;
    let stderr = collect(&stderr_reader, deadline, timeout)?;
    if !stderr.is_empty() {
        debug!(stderr = %String::from_utf8_lossy(&stderr).trim(), "tool stderr");
    }

    Ok(ToolOutput { status, stdout, stderr })
}

/// Trimmed stdout of a successful run. Anything else is a failure; an empty
/// token is never valid.
pub fn into_token_value(output: ToolOutput) -> std::result::Result<String, MintError> {
    if !output.status.success() {
        return Err(MintError::ExitStatus {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if value.is_empty() {
        return Err(MintError::EmptyOutput);
    }
    Ok(value)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let result = match pipe {
            Some(pipe) => pipe.take(MAX_OUTPUT_BYTES).read_to_end(&mut buffer).map(|_| buffer),
            None => Ok(buffer),
        };
        let _ = tx.send(result);
    });
    rx
}

fn collect(
    reader: &Receiver<io::Result<Vec<u8>>>,
    deadline: Option<Instant>,
    timeout: Duration,
) -> std::result::Result<Vec<u8>, MintError> {
    let received = match deadline {
        Some(deadline) => reader.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => reader.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(output) => Ok(output?),
        Err(RecvTimeoutError::Timeout) => Err(MintError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(io::Error::other("pipe reader thread panicked").into()),
    }
}

/// `None` deadline waits forever.
fn wait_with_deadline(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}
