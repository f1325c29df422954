use clap::Parser;
use log::LevelFilter;
use relkit::{commands::RelkitArgs, shadow};
use relkit_process_management::{logging::Logger, signal_handler};

fn main() {
    let args = RelkitArgs::parse();

    Logger::new()
        .filter_level(args.verbosity.log_level_filter())
        .filter_modules([("hyper_util", LevelFilter::Info), ("rustls", LevelFilter::Info)])
        .log_out_dir(args.log_out.clone())
        .init();

    log::trace!("Parsed arguments: {args:#?}");
    log::debug!(
        "relkit {} ({})",
        shadow::PKG_VERSION,
        shadow::RELKIT_COMMIT_HASH_SHORT
    );

    signal_handler::init(move || args.run());
}
