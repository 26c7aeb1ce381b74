//! Look up domains from the command line and print their RDAP details
//!
//! Run with: cargo run --example simple_lookup --no-default-features -- example.com

use rdap_service::{normalize, RdapClient, RdapError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("rdap_service=info")
        .init();

    println!("🔍 RDAP Lookup Example");
    println!("======================");

    let client = RdapClient::new_without_cache()?;

    let mut domains: Vec<String> = std::env::args().skip(1).collect();
    if domains.is_empty() {
        domains.push("example.com".to_string());
    }

    for domain in &domains {
        println!("\n📋 Looking up: {}", domain);
        println!("{}", "─".repeat(50));

        match client.lookup(domain).await {
            Ok(doc) => {
                let info = normalize::key_info(&doc);
                println!("📌 Key Information");
                println!("   Domain: {}", info.domain.as_deref().unwrap_or(domain));
                println!("   Status: {}", info.status);

                println!("\n👥 Contacts");
                for contact in normalize::contacts(&doc) {
                    println!("   {}: {}", contact.roles, contact.name);
                }

                println!("\n📄 Summary");
                println!("{}", normalize::format_summary(&doc));
            }
            Err(RdapError::InvalidDomain(msg)) => {
                println!("❌ Invalid domain: {}", msg);
            }
            Err(RdapError::Http { status: 404, .. }) => {
                println!("❌ Not found in RDAP");
            }
            Err(RdapError::Timeout) => {
                println!("❌ Timeout - server took too long to respond");
            }
            Err(e) => {
                println!("❌ Error: {}", e);
            }
        }
    }

    Ok(())
}
