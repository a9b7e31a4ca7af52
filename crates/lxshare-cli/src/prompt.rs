//! Interactive collection of share parameters.
//!
//! Values come from flags first, then the share file, then a prompt. Modes
//! and the read-only answer are validated as soon as they are known so a
//! typo aborts before the remaining questions are asked.

use std::io::{BufRead, Write};
use std::os::fd::AsFd;
use std::sync::atomic::{AtomicBool, Ordering};

use lxshare_common::config::ShareFile;
use lxshare_common::error::{LxshareError, Result};
use lxshare_common::types::{PermissionMode, Secret, ShareInput, parse_read_only};
use nix::sys::termios::{self, LocalFlags, SetArg};

use crate::commands::ShareArgs;

/// Source of operator answers.
pub trait Prompt {
    /// Asks for a visible value.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer can be read.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Asks for a value without echoing it.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer can be read.
    fn ask_hidden(&mut self, question: &str) -> Result<String>;
}

/// Prompts on stderr and reads answers from stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

fn stdin_error(source: std::io::Error) -> LxshareError {
    LxshareError::Io {
        path: "<stdin>".into(),
        source,
    }
}

fn read_answer() -> Result<String> {
    let mut line = String::new();
    let n = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(stdin_error)?;
    if n == 0 {
        return Err(LxshareError::Config {
            message: "standard input closed before all parameters were given".into(),
        });
    }
    Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

#[allow(clippy::print_stderr)]
fn show(question: &str) -> Result<()> {
    eprint!("{question}: ");
    std::io::stderr().flush().map_err(stdin_error)
}

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        show(question)?;
        Ok(read_answer()?.trim().to_owned())
    }

    #[allow(clippy::print_stderr)]
    fn ask_hidden(&mut self, question: &str) -> Result<String> {
        show(question)?;
        let stdin = std::io::stdin();
        let Ok(original) = termios::tcgetattr(stdin.as_fd()) else {
            // Not a terminal: nothing to hide.
            return read_answer();
        };

        let mut silent = original.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &silent)
            .map_err(|e| stdin_error(e.into()))?;
        let answer = read_answer();
        let restored = termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &original);
        eprintln!();
        restored.map_err(|e| stdin_error(e.into()))?;
        answer
    }
}

/// Stops asking once the cancel flag is raised.
struct Interruptible<'a> {
    inner: &'a mut dyn Prompt,
    cancel: &'a AtomicBool,
}

impl Interruptible<'_> {
    fn ensure_live(&self) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(LxshareError::Cancelled {
                during: "collecting share parameters",
            });
        }
        Ok(())
    }
}

impl Prompt for Interruptible<'_> {
    fn ask(&mut self, question: &str) -> Result<String> {
        self.ensure_live()?;
        let answer = self.inner.ask(question)?;
        self.ensure_live()?;
        Ok(answer)
    }

    fn ask_hidden(&mut self, question: &str) -> Result<String> {
        self.ensure_live()?;
        let answer = self.inner.ask_hidden(question)?;
        self.ensure_live()?;
        Ok(answer)
    }
}

fn pick(
    flag: Option<String>,
    file: Option<String>,
    prompt: &mut dyn Prompt,
    question: &str,
) -> Result<String> {
    match flag.or(file) {
        Some(v) => Ok(v),
        None => prompt.ask(question),
    }
}

/// Gathers raw share input in the interactive order.
///
/// With `need_password` unset, a missing password is left empty instead of
/// being asked for. Once `cancel` is raised no further question is asked.
///
/// # Errors
///
/// Returns an error if the share file cannot be loaded, an answer cannot be
/// read, a mode or read-only answer is invalid, or the run was cancelled.
pub fn collect_input(
    args: ShareArgs,
    answers: &mut dyn Prompt,
    need_password: bool,
    cancel: &AtomicBool,
) -> Result<ShareInput> {
    let prompt: &mut dyn Prompt = &mut Interruptible {
        inner: answers,
        cancel,
    };
    let file = match &args.config {
        Some(path) => ShareFile::load(path)?,
        None => ShareFile::default(),
    };

    let folder = pick(args.folder, file.folder, prompt, "Folder name (e.g. media)")?;
    let host = pick(args.host, file.host, prompt, "CIFS host (name or IP)")?;
    let share = pick(args.share, file.share, prompt, "Share name")?;
    let username = pick(args.username, file.username, prompt, "SMB username")?;
    let password = match args.password.or(file.password) {
        Some(p) => p,
        None if need_password => prompt.ask_hidden("SMB password")?,
        None => String::new(),
    };
    let container = pick(args.container, file.container, prompt, "Container ID")?;
    let guest_user = pick(args.guest_user, file.guest_user, prompt, "Guest username")?;

    let file_mode = pick(
        args.file_mode,
        file.file_mode,
        prompt,
        "File permission mode (e.g. 0770)",
    )?;
    let _ = PermissionMode::parse("file permission mode", &file_mode)?;

    let dir_mode = pick(
        args.dir_mode,
        file.dir_mode,
        prompt,
        "Directory permission mode (e.g. 0770)",
    )?;
    let _ = PermissionMode::parse("directory permission mode", &dir_mode)?;

    let read_only = pick(
        args.read_only,
        file.read_only.map(lxshare_common::config::ReadOnlySetting::into_answer),
        prompt,
        "Read-only in the guest? (Y/n)",
    )?;
    let _ = parse_read_only(&read_only)?;

    tracing::debug!(
        folder = %folder,
        host = %host,
        container = %container,
        "share input collected"
    );
    Ok(ShareInput {
        folder,
        host,
        share,
        username,
        password: Secret::new(password),
        container,
        guest_user,
        file_mode,
        dir_mode,
        read_only,
    })
}
