//! Working-directory example for scoped-callback.
//!
//! Demonstrates:
//! - A foreign-style function that reports its result through `(token, fn pointer)`
//! - A closure borrowing a local `String` via `ScopedCallback::scope`
//! - The token being released as soon as the scope ends
//!
//! Run with: `RUST_LOG=debug cargo run --example working_directory`

use scoped_callback::{global, ScopedCallback, Token};
use std::ffi::{c_char, c_int, CStr};
use std::sync::Mutex;

type CwdCallback = extern "C" fn(Token, *const c_char, usize) -> c_int;

/// Pretends to be a system call that hands the working directory to a callback.
extern "C" fn getcwdcb(token: Token, cb: CwdCallback) -> c_int {
    cb(token, c"/home".as_ptr(), 0)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== scoped-callback: Working Directory ===\n");

    let working_directory = Mutex::new(String::new());

    let token = ScopedCallback::scope(
        |dir: *const c_char, max: usize| -> c_int {
            let bytes = unsafe { CStr::from_ptr(dir) }.to_bytes();
            let len = if max == 0 { bytes.len() } else { bytes.len().min(max) };
            let mut wd = working_directory.lock().unwrap_or_else(|p| p.into_inner());
            *wd = String::from_utf8_lossy(&bytes[..len]).into_owned();
            0
        },
        |cb| {
            let status = getcwdcb(cb.token(), cb.trampoline());
            log::info!("getcwdcb returned {status} for token {}", cb.token());
            cb.token()
        },
    );

    let token = match token {
        Ok(token) => token,
        Err(err) => {
            eprintln!("registration failed: {err}");
            return;
        }
    };

    let wd = working_directory.into_inner().unwrap_or_else(|p| p.into_inner());
    println!("Working directory reported by the callback: {wd}");
    println!("Token {token} still registered: {}", global::contains(token));
}
