use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use enrollment_dashboard::charts::{ChartSink, DashboardCharts, JsonChartSink};
use enrollment_dashboard::combine;
use enrollment_dashboard::locale::{LocaleContext, LocaleStore};
use enrollment_dashboard::models::{short_institution_name, Config, Measure};
use enrollment_dashboard::source::TableSource;
use enrollment_dashboard::DashboardSession;
use std::fs;
use std::path::Path;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

fn cli() -> Command {
    Command::new("enrollment-dashboard")
        .version("0.1")
        .about("Compares university enrollment by institution and academic year")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("catalog").about("List the institutions and years that can be selected"))
        .subcommand(
            Command::new("show")
                .about("Select institution/year pairs and print the chart highlights")
                .arg(
                    Arg::new("select")
                        .short('s')
                        .long("select")
                        .value_name("INSTITUTION|YEAR")
                        .help("A pick such as \"Carleton University|2019 / 2020\" (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("locale")
                        .short('l')
                        .long("locale")
                        .value_name("CODE")
                        .help("Switch the display locale before printing"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .value_name("FILE")
                        .help("Also write the chart inputs as JSON"),
                ),
        )
        .subcommand(
            Command::new("locale")
                .about("Show the remembered locale, or switch and remember a new one")
                .arg(Arg::new("code").value_name("CODE")),
        )
        .subcommand(
            Command::new("combine")
                .about("Build the wide enrollment table from total, men and Canadian exports")
                .arg(Arg::new("total").long("total").value_name("FILE").required(true))
                .arg(Arg::new("men").long("men").value_name("FILE").required(true))
                .arg(Arg::new("canadian").long("canadian").value_name("FILE").required(true))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .default_value("combined_university_enrollment.csv"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    // combine works on raw exports and needs no configuration
    if let Some(("combine", args)) = matches.subcommand() {
        return run_combine(args);
    }

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    let config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file).with_context(|| format!("Failed to load {}", config_file))?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!("⚠️  Please edit {} and point it at your enrollment table, then run the program again.", config_file);
        return Ok(());
    };

    let store = config.locale_state_file.as_deref().map(LocaleStore::new);
    let initial_locale = store
        .as_ref()
        .and_then(|s| s.load())
        .unwrap_or_else(|| config.default_locale.clone());

    let mut session = DashboardSession::new(LocaleContext::new(&initial_locale));
    if let Some(store) = store.clone() {
        session.subscribe_locale(move |code| {
            if let Err(e) = store.save(code) {
                warn!(error = %e, "could not remember locale");
            }
        });
    }

    match matches.subcommand() {
        Some(("locale", args)) => {
            run_locale(&mut session, args);
            Ok(())
        }
        Some(("catalog", _)) => {
            load_table(&mut session, &config).await?;
            print_catalog(&session);
            Ok(())
        }
        Some(("show", args)) => {
            load_table(&mut session, &config).await?;
            run_show(&mut session, args)
        }
        _ => Ok(()),
    }
}

async fn load_table(session: &mut DashboardSession, config: &Config) -> Result<()> {
    let Some(source) = TableSource::from_config(config) else {
        bail!("no data_file or data_url configured for the selected data_source_mode");
    };
    println!("📂 Reading enrollment table from: {}", source.location());
    println!("{}", session.locale().translate("loading"));

    session.finish_load(source.fetch().await);
    if let Some(err) = session.error() {
        let reason = err.to_string();
        println!("❌ {}", session.locale().translate_with("sourceUnavailable", &[("reason", reason.as_str())]));
        bail!("enrollment source unavailable: {}", reason);
    }

    if let Some(table) = session.table() {
        println!(
            "   ✅ {} institutions, {} years",
            session.institutions().len(),
            session.years().len()
        );
        if !table.warnings.is_empty() {
            println!("   ⚠️  {} table warnings (skipped rows, extra fields, repeated columns)", table.warnings.len());
        }
    }
    Ok(())
}

fn print_catalog(session: &DashboardSession) {
    let locale = session.locale();
    println!("\n{}:", locale.translate("institutionLabel"));
    for institution in session.institutions() {
        println!("   - {}", short_institution_name(institution));
    }
    println!("\n{}:", locale.translate("yearLabel"));
    for year in session.years() {
        println!("   - {}", year);
    }
}

fn run_locale(session: &mut DashboardSession, args: &ArgMatches) {
    let available = session.available_locales();
    match args.get_one::<String>("code") {
        Some(code) => {
            if session.set_locale(code) {
                println!("🌐 {}", session.locale().translate("dashboardTitle"));
            } else {
                println!("❌ Unknown locale {} (available: {})", code, available.join(", "));
            }
        }
        None => {
            println!("🌐 {} (available: {})", session.locale().locale(), available.join(", "));
        }
    }
}

fn run_show(session: &mut DashboardSession, args: &ArgMatches) -> Result<()> {
    if let Some(code) = args.get_one::<String>("locale") {
        if !session.set_locale(code) {
            println!("⚠️  Unknown locale {}, keeping {}", code, session.locale().locale());
        }
    }

    let picks: Vec<&String> = args.get_many::<String>("select").map(|v| v.collect()).unwrap_or_default();
    for pick in picks {
        let (institution, year) = pick.rsplit_once('|').unwrap_or((pick.as_str(), ""));
        let (institution, year) = (institution.trim(), year.trim());
        if let Err(reason) = session.add_selection(institution, year) {
            println!("⚠️  {}: {}", pick, session.notice(reason));
        } else if !session.institutions().iter().any(|i| i == institution) {
            println!("⚠️  {} is not in the table and will not be charted", institution);
        }
    }

    let locale = session.locale();
    println!(
        "\n🎯 {} {}",
        locale.translate("selections"),
        session.selections().counter()
    );
    for selection in session.active_selections() {
        println!("   {} {} ({})", selection.id, short_institution_name(&selection.institution), selection.year);
    }

    let Some(charts) = session.charts() else {
        println!("   {}", locale.translate("noActiveSelections"));
        return Ok(());
    };
    print_charts(locale, &charts);

    if let Some(path) = args.get_one::<String>("json") {
        let file = fs::File::create(path).with_context(|| format!("Failed to create {}", path))?;
        JsonChartSink::new(file).render(&charts)?;
        println!("\n📄 Chart data written to {}", path);
    }
    Ok(())
}

fn print_charts(locale: &LocaleContext, charts: &DashboardCharts) {
    let pct = |value: Option<f64>| value.map(|v| locale.format_percentage(v)).unwrap_or_else(|| "-".to_string());

    let enrollment = &charts.enrollment;
    if let Some(top) = &enrollment.highlight {
        println!("\n📊 {}", locale.translate_with("charts.enrollmentTitle", &[("institution", top.as_str())]));
    }
    for bar in &enrollment.bars {
        let marker = if bar.is_largest { "★" } else { " " };
        println!("   {} {:<32} {:>12}", marker, bar.label, locale.format_number(bar.total));
    }

    println!("\n📈 {}", locale.translate("charts.trendTitle"));
    for row in &charts.trend.rows {
        let values: Vec<String> = charts
            .trend
            .series
            .iter()
            .zip(&row.values)
            .map(|(series, value)| {
                let shown = value.map(|v| locale.format_number(v)).unwrap_or_else(|| "-".to_string());
                format!("{}: {}", series.label, shown)
            })
            .collect();
        println!("   {}  {}", row.year, values.join(" | "));
    }

    let gender = &charts.gender;
    if let Some(top) = &gender.highlight {
        println!("\n⚖️  {}", locale.translate_with("charts.genderTitle", &[("institution", top.as_str())]));
    }
    for bar in &gender.bars {
        let marker = if bar.is_most_balanced { "★" } else { " " };
        println!(
            "   {} {:<27} {} {} / {} {}",
            marker,
            bar.label,
            locale.translate("tooltips.men"),
            pct(bar.men_pct),
            locale.translate("tooltips.women"),
            pct(bar.women_pct)
        );
    }

    let student_type = &charts.student_type;
    if let Some(top) = &student_type.highlight {
        println!("\n🌍 {}", locale.translate_with("charts.studentTypeTitle", &[("institution", top.as_str())]));
    }
    for bar in &student_type.bars {
        let marker = if bar.is_highest_international { "★" } else { " " };
        println!(
            "   {} {:<27} {} {} ({}) / {} {} ({})",
            marker,
            bar.label,
            locale.translate("tooltips.canadian"),
            locale.format_number(bar.canadian),
            pct(bar.canadian_pct),
            locale.translate("tooltips.international"),
            locale.format_number(bar.international),
            pct(bar.international_pct)
        );
    }
}

fn run_combine(args: &ArgMatches) -> Result<()> {
    println!("Processing total enrollment data...");
    let total = combine::read_export(path_arg(args, "total")?)?;
    println!("Processing men enrollment data...");
    let men = combine::read_export(path_arg(args, "men")?)?;
    println!("Processing Canadian students data...");
    let canadian = combine::read_export(path_arg(args, "canadian")?)?;

    println!("Combining data...");
    let combined = combine::combine(&total, &men, &canadian);
    let output = path_arg(args, "output")?;
    combined.write_to_path(output)?;
    println!("✅ Combined data saved to {}", output.display());

    println!("\n📊 Summary:");
    println!("   Total institutions: {}", combined.rows.len());
    println!("   Years covered: {}", combined.years.join(", "));
    if let Some(latest) = combined.years.last() {
        println!("   Enrollment for {}:", latest);
        for measure in Measure::ALL {
            println!("      {}: {}", measure.prefix(), combined.sum(latest, measure));
        }
    }
    Ok(())
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<String>(name)
        .map(Path::new)
        .with_context(|| format!("missing --{}", name))
}
