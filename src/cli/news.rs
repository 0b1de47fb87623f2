//! Print the latest game news.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::news::NewsFeed;

#[derive(Args, Debug)]
pub struct NewsCommand {
    /// Maximum number of articles to show
    #[arg(long, default_value_t = 5)]
    limit: usize,

    /// Print the articles as JSON
    #[arg(long)]
    json: bool,
}

impl NewsCommand {
    pub async fn execute(self) -> Result<()> {
        let items = NewsFeed::new()?.fetch(self.limit, false).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }
        if items.is_empty() {
            println!("No news found.");
            return Ok(());
        }

        for item in &items {
            println!("{}", item.title.bold());
            if !item.date.is_empty() {
                println!("  {}", item.date.dimmed());
            }
            if !item.excerpt.is_empty() {
                println!("  {}", item.excerpt);
            }
            println!("  {}\n", item.url.cyan());
        }
        Ok(())
    }
}
