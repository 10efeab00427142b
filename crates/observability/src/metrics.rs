//! 分发指标收集模块
//!
//! `record_*` 写入 `metrics` 门面；`ReportAggregator` 在内存中聚合
//! `DispatchReport`，便于输出摘要。

use std::collections::BTreeMap;

use contracts::{Consumer, DispatchReport, OutputKind};
use metrics::{counter, histogram};

/// 记录一次被接受的 put
pub fn record_put(instance: &str, kind: OutputKind) {
    counter!(
        "srd_router_puts_total",
        "instance" => instance.to_string(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// 记录一次被拒绝的 put（未知通道 / 参数错误 / 分配失败）
pub fn record_put_rejected(instance: &str, code: &'static str) {
    counter!(
        "srd_router_puts_rejected_total",
        "instance" => instance.to_string(),
        "code" => code
    )
    .increment(1);
}

/// 记录载荷转换失败
pub fn record_conversion_failure(kind: OutputKind, code: &'static str) {
    counter!(
        "srd_router_conversion_failures_total",
        "kind" => kind.as_str(),
        "code" => code
    )
    .increment(1);
}

/// 记录回调投递
pub fn record_callback(kind: OutputKind, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "srd_router_callbacks_total",
        "kind" => kind.as_str(),
        "status" => status
    )
    .increment(1);
}

/// 记录向下游实例的转发
pub fn record_forward(instance: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "srd_router_forwards_total",
        "instance" => instance.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录记录跨度 (end - start, 采样点数)
pub fn record_span_samples(kind: OutputKind, samples: u64) {
    histogram!("srd_router_record_span_samples", "kind" => kind.as_str()).record(samples as f64);
}

/// DispatchReport 聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    /// 成功的 put 总数
    pub total_puts: u64,

    /// 各类型 put 计数 (按 `OutputKind::index`)
    pub puts_by_kind: [u64; 5],

    /// 被拒绝的 put 总数
    pub rejected: u64,

    /// 回调成功接收的记录数
    pub delivered: u64,

    /// 下游 decode 调用次数
    pub forwarded: u64,

    /// 软诊断总数
    pub diagnostics: u64,

    /// 回调侧诊断 (转换失败 / 回调错误)
    pub callback_diagnostics: u64,

    /// 各实例诊断次数
    pub diagnostics_by_instance: BTreeMap<String, u64>,

    /// 记录跨度统计 (采样点)
    pub spans: SpanStats,
}

impl ReportAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, report: &DispatchReport, start: u64, end: u64) {
        self.total_puts += 1;
        self.puts_by_kind[report.kind.index()] += 1;
        if report.delivered {
            self.delivered += 1;
        }
        self.forwarded += report.forwarded.len() as u64;

        for diagnostic in &report.diagnostics {
            self.diagnostics += 1;
            if matches!(diagnostic.consumer, Consumer::Callback(_)) {
                self.callback_diagnostics += 1;
            }
            *self
                .diagnostics_by_instance
                .entry(diagnostic.instance.to_string())
                .or_insert(0) += 1;
        }

        let span = end.saturating_sub(start);
        self.spans.record(span);
        record_span_samples(report.kind, span);
    }

    /// 记录一次被拒绝的 put
    pub fn reject(&mut self) {
        self.rejected += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total_puts: self.total_puts,
            puts_by_kind: OutputKind::ALL
                .iter()
                .map(|k| (*k, self.puts_by_kind[k.index()]))
                .filter(|(_, n)| *n > 0)
                .collect(),
            rejected: self.rejected,
            delivered: self.delivered,
            forwarded: self.forwarded,
            diagnostics: self.diagnostics,
            diagnostic_rate: if self.total_puts > 0 {
                self.diagnostics as f64 / self.total_puts as f64 * 100.0
            } else {
                0.0
            },
            spans: self.spans,
            diagnostics_by_instance: self.diagnostics_by_instance.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct ReportSummary {
    pub total_puts: u64,
    pub puts_by_kind: Vec<(OutputKind, u64)>,
    pub rejected: u64,
    pub delivered: u64,
    pub forwarded: u64,
    pub diagnostics: u64,
    pub diagnostic_rate: f64,
    pub spans: SpanStats,
    pub diagnostics_by_instance: BTreeMap<String, u64>,
}

impl std::fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Total puts: {}", self.total_puts)?;
        for (kind, count) in &self.puts_by_kind {
            writeln!(f, "  {}: {}", kind.debug_name(), count)?;
        }
        writeln!(f, "Rejected puts: {}", self.rejected)?;
        writeln!(f, "Delivered to callbacks: {}", self.delivered)?;
        writeln!(f, "Downstream deliveries: {}", self.forwarded)?;
        writeln!(
            f,
            "Diagnostics: {} ({:.2}%)",
            self.diagnostics, self.diagnostic_rate
        )?;
        writeln!(f, "Record span (samples): {}", self.spans)?;

        if !self.diagnostics_by_instance.is_empty() {
            writeln!(f, "Diagnostics by instance:")?;
            for (instance, count) in &self.diagnostics_by_instance {
                writeln!(f, "  {}: {}", instance, count)?;
            }
        }

        Ok(())
    }
}

/// 每次 put 覆盖的采样区间 `[start, end)` 长度
///
/// 只保留摘要里打印的量，整数累加，不做浮点方差。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStats {
    pub count: u64,
    pub shortest: u64,
    pub longest: u64,
    pub total: u64,
}

impl SpanStats {
    pub fn record(&mut self, span: u64) {
        if self.count == 0 {
            self.shortest = span;
            self.longest = span;
        } else {
            self.shortest = self.shortest.min(span);
            self.longest = self.longest.max(span);
        }
        self.count += 1;
        self.total = self.total.saturating_add(span);
    }

    /// 平均区间长度，没有样本时为 `None`
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total as f64 / self.count as f64)
    }
}

impl std::fmt::Display for SpanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mean() {
            None => write!(f, "none recorded"),
            Some(mean) => write!(
                f,
                "{}..={} over {} puts, mean {:.1}",
                self.shortest, self.longest, self.count, mean
            ),
        }
    }
}
