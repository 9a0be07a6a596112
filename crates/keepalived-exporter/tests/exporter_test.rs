//! Integration tests for the exporter and its HTTP server

use async_trait::async_trait;
use keepalived::{
    AcquirerConfig, CommandOutput, ControlCommand, DumpMode, DumpPaths, DumpReader, DumpStamp,
    KeepalivedHost, RetryPolicy, SignalName, SignalResolver, SnapshotAcquirer,
};
use keepalived_exporter::{CheckScript, Config, Exporter, ExporterError, MetricsServer};
use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const DATA: &str = " VRRP Instance = VI_1
   State = MASTER
   Wantstate = MASTER
   Interface = ens192
   Gratuitous ARP delay = 5
   Virtual Router ID = 52
   Virtual IP = 1
     192.168.2.1/32 dev ens192 scope global
 VRRP Script = chk_haproxy
   Status = GOOD
   State = idle
";

const STATS: &str = "VRRP Instance: VI_1
  Advertisements:
    Received: 11
    Sent: 12
  Became master: 2
";

/// Host serving dumps from memory.
struct FakeHost {
    version_report: &'static str,
    files: HashMap<PathBuf, &'static str>,
    signals: Mutex<Vec<i32>>,
}

impl FakeHost {
    fn new(files: &[(PathBuf, &'static str)]) -> Self {
        Self {
            version_report: "Keepalived v2.2.8 (01/23,2023)\n\nconfigure options: --enable-json\n",
            files: files.iter().cloned().collect(),
            signals: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl KeepalivedHost for FakeHost {
    async fn run_control_command(&self, command: ControlCommand) -> common::Result<CommandOutput> {
        match command {
            ControlCommand::Version => Ok(CommandOutput::new("", self.version_report)),
            ControlCommand::SignalNumber(_) => Ok(CommandOutput::new("36\n", "")),
        }
    }

    async fn send_signal(&self, signal: i32) -> common::Result<()> {
        self.signals.lock().unwrap().push(signal);
        Ok(())
    }

    async fn open_file(&self, path: &Path) -> io::Result<DumpReader> {
        self.files
            .get(path)
            .map(|content| Cursor::new(content.as_bytes().to_vec()))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
    }

    async fn dump_stamp(&self, _path: &Path) -> Option<DumpStamp> {
        None
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn paths() -> DumpPaths {
    DumpPaths::new("/tmp")
}

fn text_exporter(host: FakeHost, check_script: Option<CheckScript>) -> Exporter {
    let signals = SignalResolver::from_signals([(SignalName::Data, 36), (SignalName::Stats, 37)]);
    let config = AcquirerConfig {
        mode: DumpMode::Text,
        paths: paths(),
        retry: RetryPolicy {
            initial_interval: Duration::from_millis(1),
            max_elapsed: Duration::from_millis(20),
        },
    };
    let acquirer = SnapshotAcquirer::new(Arc::new(host), signals, config, None);
    Exporter::new(acquirer, check_script)
}

#[tokio::test]
async fn test_scrape_renders_snapshot() {
    let host = FakeHost::new(&[(paths().data, DATA), (paths().stats, STATS)]);
    let exporter = text_exporter(host, None);

    let text = exporter.scrape().await.encode().unwrap();

    assert!(text.contains("keepalived_up 1"));
    assert!(text.contains(
        r#"keepalived_advert_sent_total{iname="VI_1",intf="ens192",vrid="52",state="MASTER"} 12"#
    ));
    assert!(text.contains(
        r#"keepalived_vrrp_state{iname="VI_1",intf="ens192",vrid="52",ip_address="192.168.2.1/32"} 2"#
    ));
    assert!(text.contains(r#"keepalived_script_status{name="chk_haproxy"} 1"#));
    assert!(text.contains(r#"keepalived_script_state{name="chk_haproxy"} 0"#));
}

#[tokio::test]
async fn test_scrape_runs_check_script_per_vip() {
    let host = FakeHost::new(&[(paths().data, DATA), (paths().stats, STATS)]);
    let script = CheckScript::new("test 192.168.2.1/32 =", Duration::from_secs(5));
    let exporter = text_exporter(host, Some(script));

    let text = exporter.scrape().await.encode().unwrap();

    assert!(text.contains(
        r#"keepalived_exporter_check_script_status{iname="VI_1",intf="ens192",vrid="52",ip_address="192.168.2.1/32"} 1"#
    ));
}

#[tokio::test]
async fn test_failed_acquisition_reports_down() {
    // The data dump never appears.
    let host = FakeHost::new(&[(paths().stats, STATS)]);
    let exporter = text_exporter(host, None);

    let text = exporter.scrape().await.encode().unwrap();

    assert!(text.contains("keepalived_up 0"));
    assert!(!text.contains("keepalived_vrrp_state"));
}

#[tokio::test]
async fn test_desynced_dumps_report_down() {
    let stats = "VRRP Instance: VI_2\n  Became master: 0\n";
    let host = FakeHost::new(&[(paths().data, DATA), (paths().stats, stats)]);
    let exporter = text_exporter(host, None);

    let text = exporter.scrape().await.encode().unwrap();
    assert!(text.contains("keepalived_up 0"));
}

#[tokio::test]
async fn test_json_mode_requires_json_support() {
    let mut host = FakeHost::new(&[]);
    host.version_report = "Keepalived v2.0.19 (10/19,2019)\n\nconfigure options: --enable-snmp\n";

    let mut config = Config::default();
    config.keepalived.json = true;

    let result = Exporter::initialize(&config, Arc::new(host)).await;
    assert!(matches!(result, Err(ExporterError::JsonUnsupported)));
}

#[tokio::test]
async fn test_initialize_text_mode() {
    let host = FakeHost::new(&[(paths().data, DATA), (paths().stats, STATS)]);
    let exporter = Exporter::initialize(&Config::default(), Arc::new(host))
        .await
        .unwrap();

    let text = exporter.scrape().await.encode().unwrap();
    assert!(text.contains("keepalived_up 1"));
}

#[tokio::test]
async fn test_http_routes() {
    let host = FakeHost::new(&[(paths().data, DATA), (paths().stats, STATS)]);
    let exporter = Arc::new(text_exporter(host, None));
    let server = MetricsServer::new(exporter, "127.0.0.1:0".to_string(), "/metrics".to_string());
    let app = server.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let index = reqwest::get(format!("http://{}/", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(index.contains("<a href='/metrics'>Metrics</a>"));

    let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("keepalived_up 1"));
    assert!(body.contains("# EOF"));
}
