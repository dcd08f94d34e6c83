//! # HTML 制品编辑器 — 命令行入口
//!
//! 本文件只负责参数解析与组件装配。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use artifact_studio::assist::{CompletionClient, CompletionConfig};
use artifact_studio::clipboard::{ArboardSink, ClipboardConfig, ClipboardExporter};
use artifact_studio::db::{self, DbState};
use artifact_studio::error::AppError;
use artifact_studio::expander::{ReferenceExpander, make_reference};
use artifact_studio::export::export_document;
use artifact_studio::library::{
    CachedResourceStore, ImageCategory, ImageResource, ResourceStore, SqliteResourceStore,
};
use artifact_studio::media::{ImageSource, MediaLoader, UploadMeta, prepare_upload};
use artifact_studio::render::{FileSurface, Orientation, PaperSize, RenderHost, RenderMode, RenderOptions};
use artifact_studio::settings::{ApiCredentials, AppSettings};
use artifact_studio::template::{NewTemplate, TemplateCategory, interpolate, template_variables};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

const APP_DIR_NAME: &str = "artifact-studio";
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(400);

#[derive(Debug, Parser)]
#[command(name = "artifact-studio", version, about = "HTML 邮件与打印制品编辑器后端")]
struct Cli {
    /// 数据目录（默认：系统数据目录下的 artifact-studio）
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// 以 JSON 输出结果
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 图片资源库
    #[command(subcommand)]
    Images(ImagesCommand),
    /// 模板
    #[command(subcommand)]
    Templates(TemplatesCommand),
    /// 展开占位符并输出 HTML 片段
    Expand(BodyArgs),
    /// 渲染到预览文件
    Preview(PreviewArgs),
    /// 生成截图用文档（远程图片已落定）
    Capture(CaptureArgs),
    /// 展开后复制到系统剪贴板
    Copy(BodyArgs),
    /// 展开后导出为 HTML 文件
    Export(ExportArgs),
    /// 通过补全接口生成 HTML 片段
    Assist(AssistArgs),
}

#[derive(Debug, Subcommand)]
enum ImagesCommand {
    /// 上传图片（URL、Data URI 或文件路径）
    Add {
        source: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "logo")]
        category: String,
    },
    List {
        #[arg(long)]
        category: Option<String>,
    },
    Delete { id: String },
    /// 输出图片的占位符
    Ref { id: String },
}

#[derive(Debug, Subcommand)]
enum TemplatesCommand {
    Add {
        file: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "email")]
        category: String,
    },
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// 输出模板正文（可插值变量）
    Show {
        id: i64,
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    Delete { id: i64 },
}

/// 正文来源：文件、`-`（标准输入）或已保存的模板。
#[derive(Debug, Args)]
struct BodyArgs {
    /// 正文文件；省略或 `-` 时读取标准输入
    #[arg(conflicts_with = "template")]
    input: Option<PathBuf>,
    /// 使用已保存的模板
    #[arg(long)]
    template: Option<i64>,
    /// 模板变量 `name=value`，可重复
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// 渲染模式
    #[arg(long, value_parser = ["email", "print"])]
    mode: Option<String>,
    /// 纸张：letter / a4（指定即进入打印模式）
    #[arg(long)]
    paper: Option<String>,
    /// 方向：portrait / landscape
    #[arg(long)]
    orientation: Option<String>,
    /// 叠加对齐网格（打印时隐藏）
    #[arg(long)]
    grid: bool,
}

#[derive(Debug, Args)]
struct PreviewArgs {
    #[command(flatten)]
    body: BodyArgs,
    #[command(flatten)]
    render: RenderArgs,
    /// 预览文件路径（默认：数据目录下 preview/index.html）
    #[arg(long)]
    out: Option<PathBuf>,
    /// 监视正文文件，变化时重新渲染
    #[arg(long)]
    watch: bool,
}

#[derive(Debug, Args)]
struct CaptureArgs {
    #[command(flatten)]
    body: BodyArgs,
    #[command(flatten)]
    render: RenderArgs,
    #[arg(long)]
    out: PathBuf,
    /// 单张远程图片的等待上限（毫秒）
    #[arg(long)]
    image_wait_ms: Option<u64>,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    body: BodyArgs,
    #[command(flatten)]
    render: RenderArgs,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct AssistArgs {
    prompt: String,
    /// 覆盖环境变量中的密钥
    #[arg(long)]
    api_key: Option<String>,
    /// 把结果保存为模板
    #[arg(long)]
    save_as: Option<String>,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("变量格式应为 name=value：{}", raw))
}

/// 装配好的运行时组件。
struct App {
    data_dir: PathBuf,
    settings: AppSettings,
    db: Arc<DbState>,
    store: Arc<dyn ResourceStore>,
    json: bool,
}

impl App {
    fn open(data_dir: Option<PathBuf>, json: bool) -> Result<Self, AppError> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .or_else(dirs::home_dir)
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or_else(|| AppError::Storage("无法确定用户数据目录".to_string()))?,
        };

        let settings = AppSettings::load(&data_dir);
        let db = Arc::new(DbState::new(db::init_db(&data_dir)?));
        let store: Arc<dyn ResourceStore> =
            Arc::new(CachedResourceStore::new(SqliteResourceStore::new(Arc::clone(&db))));

        Ok(Self {
            data_dir,
            settings,
            db,
            store,
            json,
        })
    }

    fn expander(&self) -> ReferenceExpander {
        ReferenceExpander::with_config(Arc::clone(&self.store), self.settings.expander_config())
    }

    fn loader(&self) -> MediaLoader {
        MediaLoader::new(self.settings.media_config())
    }

    fn read_body(&self, args: &BodyArgs) -> Result<String, AppError> {
        let raw = match (args.template, &args.input) {
            (Some(id), _) => {
                db::with_conn(&self.db, |conn| db::get_template(conn, id))?
                    .ok_or_else(|| AppError::InvalidInput(format!("模板不存在：{}", id)))?
                    .html
            }
            (None, Some(path)) if path.as_os_str() != "-" => std::fs::read_to_string(path)?,
            (None, _) => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        if args.vars.is_empty() {
            return Ok(raw);
        }
        let vars: HashMap<String, String> = args.vars.iter().cloned().collect();
        Ok(interpolate(&raw, &vars))
    }

    fn render_options(&self, args: &RenderArgs) -> Result<RenderOptions, AppError> {
        let defaults = self.settings.render;
        let (default_paper, default_orientation) = match defaults.mode {
            RenderMode::Print { paper, orientation } => (paper, orientation),
            RenderMode::Email => (PaperSize::Letter, Orientation::Portrait),
        };

        let wants_print = match args.mode.as_deref() {
            Some("print") => true,
            Some(_) => false,
            None => {
                args.paper.is_some()
                    || args.orientation.is_some()
                    || matches!(defaults.mode, RenderMode::Print { .. })
            }
        };

        let mode = if wants_print {
            let paper = match &args.paper {
                Some(raw) => raw.parse()?,
                None => default_paper,
            };
            let orientation = match &args.orientation {
                Some(raw) => raw.parse()?,
                None => default_orientation,
            };
            RenderMode::Print { paper, orientation }
        } else {
            RenderMode::Email
        };

        Ok(RenderOptions {
            mode,
            show_grid: args.grid || defaults.show_grid,
        })
    }

    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<(), AppError> {
        if self.json {
            let text = serde_json::to_string_pretty(value)
                .map_err(|e| AppError::InvalidInput(format!("序列化输出失败: {}", e)))?;
            println!("{}", text);
        } else {
            human(value);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ImageSummary<'a> {
    id: &'a str,
    name: &'a str,
    category: ImageCategory,
    mime_type: &'a str,
    width: Option<u32>,
    height: Option<u32>,
    reference: String,
}

impl<'a> From<&'a ImageResource> for ImageSummary<'a> {
    fn from(resource: &'a ImageResource) -> Self {
        Self {
            id: &resource.id,
            name: &resource.name,
            category: resource.category,
            mime_type: resource.effective_mime(),
            width: resource.width,
            height: resource.height,
            reference: make_reference(&resource.id),
        }
    }
}

fn print_image_line(summary: &ImageSummary<'_>) {
    let size = match (summary.width, summary.height) {
        (Some(w), Some(h)) => format!("{}x{}", w, h),
        _ => "-".to_string(),
    };
    println!(
        "{}\t{}\t{}\t{}\t{}",
        summary.id,
        summary.category.as_str(),
        size,
        summary.name,
        summary.reference
    );
}

async fn run_images(app: &App, command: ImagesCommand) -> Result<(), AppError> {
    match command {
        ImagesCommand::Add {
            source,
            name,
            description,
            category,
        } => {
            let meta = UploadMeta {
                name,
                description,
                category: category.parse()?,
            };
            let prepared = prepare_upload(&app.loader(), &ImageSource::detect(&source), meta).await?;
            let created = app.store.insert(prepared).await?;
            app.emit(&ImageSummary::from(&created), print_image_line)
        }
        ImagesCommand::List { category } => {
            let categories = match category {
                Some(raw) => vec![raw.parse::<ImageCategory>()?],
                None => vec![ImageCategory::Logo, ImageCategory::Banner],
            };

            let mut resources = Vec::new();
            for category in categories {
                resources.extend(app.store.list_by_category(category).await?);
            }
            let summaries: Vec<ImageSummary<'_>> = resources.iter().map(ImageSummary::from).collect();
            app.emit(&summaries, |list| list.iter().for_each(print_image_line))
        }
        ImagesCommand::Delete { id } => {
            let deleted = app.store.delete(&id).await?;
            if !deleted {
                return Err(AppError::InvalidInput(format!("图片不存在：{}", id)));
            }
            app.emit(&id, |id| println!("已删除 {}", id))
        }
        ImagesCommand::Ref { id } => {
            if app.store.fetch_by_id(&id).await?.is_none() {
                log::warn!("⚠️ 图片资源不存在，占位符展开时将原样保留 - id: {}", id);
            }
            app.emit(&make_reference(&id), |token| println!("{}", token))
        }
    }
}

fn run_templates(app: &App, command: TemplatesCommand) -> Result<(), AppError> {
    match command {
        TemplatesCommand::Add { file, name, category } => {
            let new = NewTemplate {
                name,
                category: category.parse()?,
                html: std::fs::read_to_string(&file)?,
            };
            let created = db::with_conn(&app.db, |conn| db::create_template(conn, new))?;
            app.emit(&created, |t| println!("{}\t{}\t{}", t.id, t.category.as_str(), t.name))
        }
        TemplatesCommand::List { category } => {
            let category = category.map(|raw| raw.parse::<TemplateCategory>()).transpose()?;
            let templates = db::with_conn(&app.db, |conn| db::list_templates(conn, category))?;
            app.emit(&templates, |list| {
                for t in list {
                    let vars = template_variables(&t.html);
                    println!("{}\t{}\t{}\t{}", t.id, t.category.as_str(), t.name, vars.join(","));
                }
            })
        }
        TemplatesCommand::Show { id, vars } => {
            let template = db::with_conn(&app.db, |conn| db::get_template(conn, id))?
                .ok_or_else(|| AppError::InvalidInput(format!("模板不存在：{}", id)))?;
            let vars: HashMap<String, String> = vars.into_iter().collect();
            let html = interpolate(&template.html, &vars);
            app.emit(&html, |html| println!("{}", html))
        }
        TemplatesCommand::Delete { id } => {
            if !db::with_conn(&app.db, |conn| db::delete_template(conn, id))? {
                return Err(AppError::InvalidInput(format!("模板不存在：{}", id)));
            }
            app.emit(&id, |id| println!("已删除 {}", id))
        }
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

async fn run_preview(app: &App, args: PreviewArgs) -> Result<(), AppError> {
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| app.data_dir.join("preview").join("index.html"));
    let host = Arc::new(
        RenderHost::new(app.expander(), Arc::new(FileSurface::new(&out)))
            .with_capture(app.loader(), app.settings.capture_config())
            .with_options(app.render_options(&args.render)?),
    );

    let body = app.read_body(&args.body)?;
    let outcome = host.refresh(&body).await?;
    app.emit(&outcome, |_| println!("{}", out.display()))?;

    let watched = match (&args.body.input, args.watch) {
        (Some(path), true) if path.as_os_str() != "-" => path.clone(),
        (_, true) => return Err(AppError::InvalidInput("--watch 需要正文文件".to_string())),
        _ => return Ok(()),
    };

    log::info!("👀 监视正文文件 - {}", watched.display());
    let mut last_seen = modified_at(&watched);
    loop {
        tokio::time::sleep(WATCH_POLL_INTERVAL).await;
        let current = modified_at(&watched);
        if current == last_seen {
            continue;
        }
        last_seen = current;

        let body = match app.read_body(&args.body) {
            Ok(body) => body,
            Err(err) => {
                log::warn!("⚠️ 读取正文失败，跳过本次刷新: {}", err);
                continue;
            }
        };

        // 刷新并发进行，较早的慢结果由宿主按代号丢弃
        let host = Arc::clone(&host);
        tokio::spawn(async move {
            if let Err(err) = host.refresh(&body).await {
                log::error!("❌ 预览刷新失败: {}", err);
            }
        });
    }
}

async fn run_capture(app: &App, args: CaptureArgs) -> Result<(), AppError> {
    let mut capture = app.settings.capture_config();
    if let Some(wait_ms) = args.image_wait_ms {
        capture.image_wait = Duration::from_millis(wait_ms);
    }

    let host = RenderHost::new(app.expander(), Arc::new(FileSurface::new(&args.out)))
        .with_capture(app.loader(), capture)
        .with_options(app.render_options(&args.render)?);

    let body = app.read_body(&args.body)?;
    let document = host.prepare_capture(&body).await;

    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&args.out, &document.html)?;

    app.emit(&document.images, |report| {
        println!(
            "{}（内联 {} 张，跳过 {} 张）",
            args.out.display(),
            report.inlined.len(),
            report.skipped.len()
        )
    })
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let app = App::open(cli.data_dir, cli.json)?;

    match cli.command {
        Command::Images(command) => run_images(&app, command).await,
        Command::Templates(command) => run_templates(&app, command),
        Command::Expand(args) => {
            let body = app.read_body(&args)?;
            let expansion = app.expander().expand_with_report(&body).await;
            app.emit(&expansion.outcome, |_| println!("{}", expansion.html))
        }
        Command::Preview(args) => run_preview(&app, args).await,
        Command::Capture(args) => run_capture(&app, args).await,
        Command::Copy(args) => {
            let body = app.read_body(&args)?;
            let exporter = ClipboardExporter::new(
                app.expander(),
                Arc::new(ArboardSink::new(ClipboardConfig::default())),
            );
            let report = exporter.copy(&body).await?;
            app.emit(&report, |r| println!("已复制（{}KB HTML）", r.html_bytes / 1024))
        }
        Command::Export(args) => {
            let body = app.read_body(&args.body)?;
            let options = app.render_options(&args.render)?;
            let report = export_document(&app.expander(), &body, &options, &args.out).await?;
            app.emit(&report, |r| println!("{}", r.path.display()))
        }
        Command::Assist(args) => {
            let credentials = ApiCredentials::from_env();
            if let Some(key) = args.api_key {
                credentials.set(key);
            }

            let client = CompletionClient::new(CompletionConfig::from(&app.settings))?;
            let html = client.complete(&credentials, &args.prompt).await?;

            if let Some(name) = args.save_as {
                let new = NewTemplate {
                    name,
                    category: TemplateCategory::Email,
                    html: html.clone(),
                };
                let created = db::with_conn(&app.db, |conn| db::create_template(conn, new))?;
                log::info!("✅ 已保存为模板 - id: {}", created.id);
            }
            app.emit(&html, |html| println!("{}", html))
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        log::error!("❌ {}", err);
        eprintln!("错误: {}", err);
        std::process::exit(1);
    }
}
