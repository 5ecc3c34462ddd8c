use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "LOCKBOX_PASSWORD";
pub const NEW_PASSWORD_ENV: &str = "LOCKBOX_NEW_PASSWORD";

/// Master password, from the environment, a pipe, or the terminal.
pub fn read_password() -> Result<Zeroizing<String>> {
    //  LOCKBOX_PASSWORD="supersecret" lockbox get email
    if let Some(pw) = from_env(PASSWORD_ENV) {
        return Ok(pw);
    }

    //  printf "%s\n" "$PW" | lockbox get email
    if !io::stdin().is_terminal() {
        let mut pw = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut pw)?;
        trim_newline(&mut pw);

        if !pw.is_empty() {
            return Ok(pw);
        }
    } else {
        let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
        if !pw.is_empty() {
            return Ok(pw);
        }
    }

    bail!("no password provided")
}

/// New password for `chpw`: the environment, two piped lines, or a
/// confirmed prompt.
pub fn read_new_password_with_confirmation() -> Result<Zeroizing<String>> {
    if let Some(pw) = from_env(NEW_PASSWORD_ENV) {
        return Ok(pw);
    }

    let (pw1, pw2) = if !io::stdin().is_terminal() {
        let mut handle = io::stdin().lock();

        let mut pw1 = Zeroizing::new(String::new());
        let mut pw2 = Zeroizing::new(String::new());

        handle.read_line(&mut pw1)?;
        handle.read_line(&mut pw2)?;

        trim_newline(&mut pw1);
        trim_newline(&mut pw2);
        (pw1, pw2)
    } else {
        (
            Zeroizing::new(rpassword::prompt_password("New password: ")?),
            Zeroizing::new(rpassword::prompt_password("Confirm password: ")?),
        )
    };

    if pw1.is_empty() {
        bail!("password cannot be empty");
    }

    if pw1 != pw2 {
        bail!("passwords do not match");
    }

    Ok(pw1)
}

fn from_env(name: &str) -> Option<Zeroizing<String>> {
    std::env::var(name)
        .ok()
        .map(Zeroizing::new)
        .filter(|pw| !pw.is_empty())
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
