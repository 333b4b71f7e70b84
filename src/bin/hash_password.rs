//! Prints a bcrypt hash for the `password_hash` field of the users file.

use std::io::{self, Write};

use login_governor::auth::password::PasswordManager;

fn main() -> anyhow::Result<()> {
    eprint!("Enter password: ");
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim();

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    println!("{}", PasswordManager::hash(password)?);
    Ok(())
}
