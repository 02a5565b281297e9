use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use folio::build::{build_site, write_feed_file};
use folio::config::Config;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn app() -> App<'static, 'static> {
    let project = Arg::with_name("DIR")
        .help("The project directory, or any directory beneath it")
        .default_value(".");
    App::new("folio")
        .version(crate_version!())
        .about("Builds a linked site from a tree of Markdown notes")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Logs progress at info level"),
        )
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site and writes the feed")
                .arg(project.clone())
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("The output directory [default: DIR/_site]"),
                )
                .arg(
                    Arg::with_name("threads")
                        .short("j")
                        .long("threads")
                        .takes_value(true)
                        .value_name("N")
                        .help("The number of worker threads"),
                ),
        )
        .subcommand(
            SubCommand::with_name("check")
                .about("Lists internal links that point at missing pages")
                .arg(project),
        )
}

fn main() -> Result<()> {
    let matches = app().get_matches();

    // --verbose selects info, otherwise RUST_LOG, otherwise warn
    let verbose = matches.is_present("verbose")
        || matches
            .subcommand()
            .1
            .map_or(false, |sub| sub.is_present("verbose"));
    let filter = match verbose {
        true => EnvFilter::new("info"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match matches.subcommand() {
        ("build", Some(matches)) => build(matches),
        ("check", Some(matches)) => check(matches),
        _ => Ok(()),
    }
}

fn project_dir<'a>(matches: &'a ArgMatches<'_>) -> &'a Path {
    Path::new(matches.value_of("DIR").unwrap_or("."))
}

fn load_config(matches: &ArgMatches<'_>) -> Result<Config> {
    Ok(Config::from_directory(&project_dir(matches).canonicalize()?)?)
}

fn build(matches: &ArgMatches<'_>) -> Result<()> {
    let config = load_config(matches)?;
    let threads = match matches.value_of("threads") {
        Some(threads) => Some(threads.parse::<usize>()?),
        None => config.threads,
    };
    init_thread_pool(threads)?;

    let output = match matches.value_of("output") {
        Some(output) => PathBuf::from(output),
        None => project_dir(matches).join("_site"),
    };

    let site = build_site(&config)?;
    let feed = write_feed_file(&config, &site, &output)?;
    println!(
        "Built {} pages ({} dead links), wrote {}",
        site.pages.len(),
        site.dead_links.len(),
        feed.display()
    );
    Ok(())
}

fn check(matches: &ArgMatches<'_>) -> Result<()> {
    let config = load_config(matches)?;
    let site = build_site(&config)?;
    for link in &site.dead_links {
        println!("{} -> {}", link.from, link.to);
    }
    if site.dead_links.is_empty() {
        println!("No dead links in {} pages", site.pages.len());
    }
    Ok(())
}

// Leaves rayon's default pool alone unless a thread count is given.
fn init_thread_pool(threads: Option<usize>) -> Result<()> {
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    Ok(())
}
