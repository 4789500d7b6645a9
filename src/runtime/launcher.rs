//! Launcher entry point and control flow.

use super::{
    HostFeatures, LaunchError, Selection, detect, replace::replace_process, select::select,
};
use crate::payload::{EmbeddedPayloads, decode_payload};
use crate::tier::Tier;
use std::io::Write;
use std::marker::PhantomData;

/// Debug switch read at startup.
pub const DEBUG_VAR: &str = "MICROARCHDEBUG";

/// `env_logger` filter variable for the launcher's own log output.
pub const LOG_VAR: &str = "MICROARCH_LOG";

/// Exit status for any launcher failure.
pub const FATAL_EXIT_CODE: i32 = 2;

const TRACE_PREFIX: &str = "[microarch] launcher";

/// Behavior selected by [`DEBUG_VAR`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugMode {
    /// Write the decoded image to stdout and exit 0 instead of executing it
    Extract,
    /// Report the selected tier on stderr, then execute as usual
    Log,
}

impl DebugMode {
    /// Parses the debug variable's value.
    ///
    /// Only `"extract"` and `"log"` are recognized; anything else is silent.
    pub fn from_value(value: Option<&str>) -> Option<Self> {
        match value? {
            "extract" => Some(Self::Extract),
            "log" => Some(Self::Log),
            _ => None,
        }
    }
}

/// A tier chosen and its image decoded, ready to run.
#[derive(Debug)]
pub struct Prepared<T> {
    pub selection: Selection<T>,
    pub image: Vec<u8>,
}

/// Launcher for tier family `T`.
pub struct Launcher<'a, T: Tier> {
    payloads: EmbeddedPayloads<'a>,
    override_value: Option<String>,
    debug: Option<DebugMode>,
    host: HostFeatures,
    _family: PhantomData<T>,
}

impl<'a, T: Tier> Launcher<'a, T> {
    /// A launcher with no override, no debug mode and no host features.
    pub fn new(payloads: EmbeddedPayloads<'a>) -> Self {
        Self {
            payloads,
            override_value: None,
            debug: None,
            host: HostFeatures::default(),
            _family: PhantomData,
        }
    }

    /// Configures the launcher from the process environment and the host CPU.
    pub fn from_env(payloads: EmbeddedPayloads<'a>) -> Self {
        let override_value =
            std::env::var_os(T::ENV_VAR).map(|value| value.to_string_lossy().into_owned());
        let debug = std::env::var_os(DEBUG_VAR).map(|value| value.to_string_lossy().into_owned());

        Self::new(payloads)
            .with_override(override_value.as_deref())
            .with_debug(DebugMode::from_value(debug.as_deref()))
            .with_host(HostFeatures::probe())
    }

    pub fn with_override(mut self, value: Option<&str>) -> Self {
        self.override_value = value.map(str::to_string);
        self
    }

    pub fn with_debug(mut self, debug: Option<DebugMode>) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_host(mut self, host: HostFeatures) -> Self {
        self.host = host;
        self
    }

    /// Detects, selects and decodes. Nothing is executed.
    pub fn prepare(&self) -> Result<Prepared<T>, LaunchError> {
        let selection = detect::<T>(self.override_value.as_deref(), &self.host);
        log::debug!(
            "selected {}={} ({})",
            T::ENV_VAR,
            selection.tier,
            selection.source
        );

        let payload = select(&self.payloads, selection.tier)?;
        let image = decode_payload::<T>(&self.payloads, payload)?;
        Ok(Prepared { selection, image })
    }

    /// Runs the launcher to completion.
    ///
    /// Returns `Ok(())` only in extract mode, after the image has been written
    /// to `stdout`. Otherwise the process is replaced, or an error is returned.
    pub fn run<O: Write, E: Write>(&self, stdout: &mut O, stderr: &mut E) -> Result<(), LaunchError> {
        let prepared = self.prepare()?;

        match self.debug {
            Some(DebugMode::Extract) => {
                let _ = writeln!(stderr, "{}", trace_line("dumping", &prepared.selection));
                stdout
                    .write_all(&prepared.image)
                    .and_then(|()| stdout.flush())
                    .map_err(LaunchError::Extract)?;
                return Ok(());
            }
            Some(DebugMode::Log) => {
                let _ = writeln!(stderr, "{}", trace_line("starting", &prepared.selection));
            }
            None => {}
        }

        let name = memfd_name::<T>(&prepared.selection.tier);
        match replace_process(&prepared.image, &name)? {}
    }
}

/// Runs a generated launcher. Never returns.
///
/// Exits 0 after an extract-mode dump. Any failure is printed to stderr and
/// ends the process with [`FATAL_EXIT_CODE`].
pub fn launch<T: Tier>(payloads: &EmbeddedPayloads<'_>) -> ! {
    if std::env::var_os(LOG_VAR).is_some() {
        let _ = env_logger::Builder::from_env(env_logger::Env::new().filter(LOG_VAR)).try_init();
    }

    let result =
        Launcher::<T>::from_env(*payloads).run(&mut std::io::stdout(), &mut std::io::stderr());
    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("{TRACE_PREFIX}: {err}");
            std::process::exit(FATAL_EXIT_CODE)
        }
    }
}

fn trace_line<T: Tier>(verb: &str, selection: &Selection<T>) -> String {
    format!(
        "{TRACE_PREFIX}: {verb} variant {}={} ({})",
        T::ENV_VAR,
        selection.tier,
        selection.source
    )
}

fn memfd_name<T: Tier>(tier: &T) -> String {
    let exe = std::env::current_exe()
        .map(|path| path.display().to_string())
        .ok()
        .or_else(|| {
            std::env::args_os()
                .next()
                .map(|arg0| arg0.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "launcher".to_string());
    format!("{exe} [{}={tier}]", T::ENV_VAR)
}
