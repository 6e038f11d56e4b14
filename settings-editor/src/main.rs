use std::io;

use clap::Parser;
use log::debug;
use settings_editor::{app::App, cli::Cli, dump, term};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_logging()?;
    debug!("{cli:?}");

    let tree = cli.build_tree()?;

    if cli.dump {
        let mut stdout = io::stdout().lock();
        if cli.json {
            dump::write_json(tree.tree(), &mut stdout)?;
        } else {
            dump::write_tree(tree.tree(), &mut stdout)?;
        }
        if let Some(err) = tree.last_sync_error() {
            eprintln!("warning: {err}");
        }
        return Ok(());
    }

    term::run(App::new(tree)).await
}
