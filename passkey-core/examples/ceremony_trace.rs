//! Example demonstrating ceremony tracing against the mock collaborators.
//!
//! Run with: cargo run -p passkey-core --example ceremony_trace

use passkey_core::mock::{sample_creation_reply, sample_request_reply, MockHarness};
use passkey_core::{
    AuthenticationHook, ClientCapabilities, RegistrationHook, CREATE_CREDENTIAL,
    GENERATE_CREDENTIAL_AUTHENTICATION, GENERATE_CREDENTIAL_REGISTRATION,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("passkey_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Passkey Ceremony Tracing Demo ===\n");

    let page = MockHarness::new();
    page.peer
        .set_reply(GENERATE_CREDENTIAL_REGISTRATION, sample_creation_reply());
    page.peer
        .set_reply(GENERATE_CREDENTIAL_AUTHENTICATION, sample_request_reply());
    page.platform
        .set_capabilities(Some(ClientCapabilities::new().with("conditionalGet", true)));

    let registration = RegistrationHook::new(page.context());
    let authentication = AuthenticationHook::new(page.context());

    if let Err(e) = registration.mounted().await {
        eprintln!("Registration hook failed to mount: {}", e);
        return;
    }
    match authentication.mounted().await {
        Ok(started) => println!("Conditional login started: {}\n", started),
        Err(e) => {
            eprintln!("Authentication hook failed to mount: {}", e);
            return;
        }
    }

    page.events.dispatch(CREATE_CREDENTIAL);
    let failures = page.spawner.run_pending().await;

    println!();
    for event in page.peer.event_names() {
        println!("   pushed {}", event);
    }
    if failures.is_empty() {
        println!("\n✅ All ceremonies settled");
    } else {
        for e in failures {
            println!("\n❌ Failed: {}", e);
        }
    }
}
