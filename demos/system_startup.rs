//! System-startup example for scoped-callback.
//!
//! Demonstrates:
//! - The same foreign-style API driven by both strategies
//! - `ScopedCallback`: counter token looked up in the global registry
//! - `DirectCallback`: the holder's own address used as the token
//! - Tracing registry operations
//!
//! Run with: `RUST_LOG=trace cargo run --example system_startup`

use scoped_callback::{global, DirectCallback, ScopedCallback, Token};
use std::ffi::{c_char, c_int, CStr};
use std::sync::Mutex;

/// Prints `config` and reports the startup result through `cb`.
extern "C" fn inicializar(
    token: Token,
    cb: extern "C" fn(Token, *const c_char, usize) -> c_int,
    config: *const c_char,
) -> c_int {
    println!("   config: {}", unsafe { CStr::from_ptr(config) }.to_string_lossy());
    cb(token, c"{ \"success\": true }".as_ptr(), 0)
}

/// `inicializar` taking the direct-strategy trampoline.
extern "C" fn inicializar_direct(
    token: Token,
    cb: unsafe extern "C" fn(Token, *const c_char, usize) -> c_int,
    config: *const c_char,
) -> c_int {
    println!("   config: {}", unsafe { CStr::from_ptr(config) }.to_string_lossy());
    unsafe { cb(token, c"{ \"success\": true }".as_ptr(), 0) }
}

fn store_json(target: &Mutex<String>, json: *const c_char, max: usize) -> c_int {
    let bytes = unsafe { CStr::from_ptr(json) }.to_bytes();
    let len = if max == 0 { bytes.len() } else { bytes.len().min(max) };
    *target.lock().unwrap_or_else(|p| p.into_inner()) =
        String::from_utf8_lossy(&bytes[..len]).into_owned();
    0
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== scoped-callback: System Startup ===\n");

    global::set_trace_callback(|event| println!("   [trace] {event}"));

    // -------------------------------------------------------------------------
    // 1. Registry strategy
    // -------------------------------------------------------------------------
    println!("1. Scoped callback...");

    let scoped_result = Mutex::new(String::new());
    if let Err(err) = ScopedCallback::scope(
        |json: *const c_char, max: usize| store_json(&scoped_result, json, max),
        |cb| inicializar(cb.token(), cb.trampoline(), c"{}".as_ptr()),
    ) {
        eprintln!("   registration failed: {err}");
        return;
    }

    println!("   Result: {}", scoped_result.lock().unwrap_or_else(|p| p.into_inner()));

    // -------------------------------------------------------------------------
    // 2. Direct strategy
    // -------------------------------------------------------------------------
    println!("\n2. Direct callback...");

    let direct_result = Mutex::new(String::new());
    {
        let cb = DirectCallback::new(|json: *const c_char, max: usize| {
            store_json(&direct_result, json, max)
        });
        log::info!("direct token {:#x}", cb.token());
        inicializar_direct(cb.token(), cb.trampoline(), c"{}".as_ptr());
    }

    println!("   Result: {}", direct_result.lock().unwrap_or_else(|p| p.into_inner()));

    global::clear_trace_callback();

    println!("\n=== Example completed successfully! ===");
}
