#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dry_run = std::env::args().skip(1).any(|arg| arg == "--dry-run");

    match examhall_rust::backfill_question_types(dry_run).await {
        Ok(updated) => {
            println!("question types backfilled: {updated}");
            Ok(())
        }
        Err(e) => {
            eprintln!("examhall-backfill fatal: {e:#}");
            std::process::exit(1);
        }
    }
}
