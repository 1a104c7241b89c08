use std::sync::Arc;

use domain::{PostId, UserId};
use threads::{CommentCounter, HttpStore, ThreadManager};
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let base_url = env_or("PELERIN_API_URL", "http://127.0.0.1:3000");
    let post_id = PostId::new(env_or("PELERIN_POST_ID", "pelerinaj-putna"))
        .map_err(anyhow::Error::msg)?;
    let me = UserId::new(env_or("PELERIN_USER_ID", "demo-user"));

    let store = Arc::new(HttpStore::new(&base_url));
    let counter = Arc::new(CommentCounter::default());
    let thread = ThreadManager::new(store.clone(), store)
        .with_viewer(me.clone())
        .with_listener(counter.clone());

    println!("[1/4] Opening thread {} on {}...", post_id, base_url);
    thread.open_thread(post_id).await?;
    counter.set(thread.total_count().await.unwrap_or(0));
    for c in thread.comments().await {
        println!(
            "   - [{}] {} ({} replies): {}",
            c.comment.created_at, c.author.display_name, c.reply_count, c.comment.text
        );
    }
    println!("   -> has more: {:?}", thread.has_more().await);

    println!("\n[2/4] Posting a comment...");
    let top = thread
        .submit_comment("Doamne ajută! Ne vedem la mănăstire.", Some(&me))
        .await?;
    println!("   -> saved as {}", top.id());

    println!("\n[3/4] Replying to it...");
    let reply = thread
        .submit_reply(top.id(), "Eu vin cu trenul de dimineață.", Some(&me))
        .await?;
    println!("   -> saved as {}", reply.id());

    println!("\n[4/4] Replies under {}:", top.id());
    for r in thread.replies(top.id()).await {
        println!("   - {}: {}", r.author.display_name, r.comment.text);
    }
    println!("\nPost now shows {} comment(s).", counter.get());

    thread.close_thread().await;
    Ok(())
}
