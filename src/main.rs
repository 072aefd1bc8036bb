use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};
mod config;
mod error;
mod events;
pub mod mappings;
mod profile;
mod services;
mod utils;

use config::{Config, LoggingConfig};
use mappings::KeyDescriptor;
use profile::Profile;
use services::{
    create_keyboard_listener, create_window_tracker, running_processes, ActionExecutor,
    ArboardClipboard, ClipboardProvider, HotkeyDispatcher, InterceptTable, KeyEmitter,
    ProcessMonitor, VirtualDevice,
};

#[derive(Parser, Debug)]
#[command(name = "ahk-remap")]
#[command(about = "Переназначение клавиш на текст, символы и комбинации в окне выбранного процесса")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "ahk-remap.toml")]
    config: String,

    /// Режим сухого запуска (без реальных действий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Профиль вместо current_profile из конфигурации
    #[arg(short, long)]
    profile: Option<String>,

    /// Целевой процесс вместо указанного в профиле
    #[arg(short, long)]
    target: Option<String>,

    /// Показать запущенные процессы (с необязательным фильтром) и выйти
    #[arg(long, value_name = "FILTER")]
    list_processes: Option<Option<String>>,

    /// Выполнить действие для клавиши один раз и выйти
    #[arg(long, value_name = "KEY")]
    test_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let mut config = Config::load(&args.config)?;

    // Инициализация системы логирования
    init_tracing(&config.logging, args.log_level.as_deref())?;

    info!("Запуск AHK Remap v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if let Some(filter) = &args.list_processes {
        let processes = running_processes(filter.as_deref());
        for name in &processes {
            println!("{}", name);
        }
        info!("Найдено процессов: {}", processes.len());
        return Ok(());
    }

    apply_profile_override(&mut config, &args);
    let profile = build_profile(&config, &args);

    if args.dry_run {
        warn!("Режим сухого запуска - реальные действия отключены");
    } else {
        // Проверка прав доступа
        utils::permissions::check_permissions()?;
    }

    // Компоненты создаются от листьев к ядру
    let virtual_device = Arc::new(VirtualDevice::new("AHK-Remap Virtual Device", args.dry_run)?);
    let emitter: Arc<dyn KeyEmitter> = virtual_device.clone();

    let tracker = create_window_tracker(&config, args.dry_run)?;
    let monitor = Arc::new(ProcessMonitor::new(tracker, &config.monitor, &profile.target_process));
    monitor.start()?;

    let clipboard = if args.dry_run {
        None
    } else {
        ArboardClipboard::try_new().map(|c| Box::new(c) as Box<dyn ClipboardProvider>)
    };
    let executor = Arc::new(ActionExecutor::new(emitter.clone(), clipboard, &config.executor)?);

    let table = Arc::new(InterceptTable::new(&config.input.reserved_keys));
    let dispatcher = Arc::new(HotkeyDispatcher::new(table.clone(), monitor.clone(), executor));
    dispatcher.load_profile(&profile)?;

    if let Some(raw_key) = &args.test_key {
        let result = run_test_key(&dispatcher, raw_key).await;
        monitor.stop().await;
        return result;
    }

    if let Err(e) = dispatcher.start() {
        error!("Не удалось запустить перехват для профиля '{}': {}", profile.name, e);
        monitor.stop().await;
        return Err(e.into());
    }

    let keyboard_listener = create_keyboard_listener(&config, table.clone(), emitter.clone(), args.dry_run)?;

    info!("Все компоненты инициализированы");

    let keyboard_handle = tokio::spawn(async move {
        if let Err(e) = keyboard_listener.run().await {
            error!("Ошибка в KeyboardListener: {}", e);
        }
    });

    info!("Статус: {}", monitor.status());

    // Ожидание сигнала завершения; SIGHUP перечитывает конфигурацию
    let mut hangup = unix_signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break;
            }
            _ = hangup.recv() => {
                info!("Получен SIGHUP, перечитываем конфигурацию");
                match reload_profile(&args, &dispatcher) {
                    Ok(name) => info!("Профиль '{}' загружен. Статус: {}", name, monitor.status()),
                    Err(e) => error!("Не удалось перезагрузить профиль: {}", e),
                }
            }
        }
    }

    info!("Завершение работы...");

    dispatcher.stop();
    monitor.stop().await;
    info!("Статус: {}", monitor.status());

    // Гарантируем отсутствие залипших клавиш
    if let Err(e) = virtual_device.release_all_keys() {
        warn!("Не удалось выполнить release_all_keys: {}", e);
    }

    keyboard_handle.abort();
    match tokio::time::timeout(Duration::from_secs(5), keyboard_handle).await {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("AHK Remap завершил работу");
    Ok(())
}

fn apply_profile_override(config: &mut Config, args: &Args) {
    if let Some(profile) = &args.profile {
        config.current_profile = profile.clone();
    }
    config.normalize_profiles();
    debug!("Доступные профили: {}", config.profile_names().join(", "));
}

fn build_profile(config: &Config, args: &Args) -> Profile {
    let profile_config = config
        .profile(&config.current_profile)
        .cloned()
        .unwrap_or_default();

    let mut profile = Profile::from_config(&config.current_profile, &profile_config);
    if let Some(target) = &args.target {
        profile.target_process = target.trim().to_string();
    }

    info!(
        "Профиль '{}': целевой процесс '{}', назначений: {}",
        profile.name,
        profile.target_process,
        profile.len()
    );
    for (key, action) in profile.iter() {
        info!("  {} -> {}", key, action.describe());
    }

    profile
}

fn reload_profile(args: &Args, dispatcher: &HotkeyDispatcher) -> Result<String> {
    let mut config = Config::load(&args.config)?;
    apply_profile_override(&mut config, args);

    let profile = build_profile(&config, args);
    dispatcher.switch_profile(&profile, true)?;
    Ok(profile.name)
}

async fn run_test_key(dispatcher: &Arc<HotkeyDispatcher>, raw_key: &str) -> Result<()> {
    let key = KeyDescriptor::parse(raw_key)?;
    info!("Тест '{}' через 2 секунды, переключитесь в нужное окно...", key);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let dispatcher = Arc::clone(dispatcher);
    tokio::task::spawn_blocking(move || dispatcher.test_mapping(&key)).await??;

    info!("Тест завершен");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig, cli_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let directives = match cli_level {
        Some(level) => level.to_string(),
        None if !logging.filter.trim().is_empty() => logging.filter.clone(),
        None => logging.level.clone(),
    };

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directives))?;
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }

    Ok(())
}
