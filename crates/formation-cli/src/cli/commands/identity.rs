//! `formation identity` - print the derived node identity.

use anyhow::Result;

use super::Context;
use crate::config;

pub fn execute(ctx: &Context) -> Result<()> {
    let identity = config::identity(&ctx.node)?;
    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}
