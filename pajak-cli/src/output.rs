//! Human-readable rendering of pipeline results.

use std::fmt::Write;

use pajak_rag::{Answer, CollectionSnapshot, FileKind, IngestReport, TypeLoad};

const RULE_WIDTH: usize = 80;

/// Characters of each source shown under an answer.
pub const SOURCE_PREVIEW_CHARS: usize = 300;

/// Characters of each sample shown by `dump`.
pub const SAMPLE_PREVIEW_CHARS: usize = 200;

/// Samples shown by `dump`.
pub const SAMPLE_COUNT: usize = 3;

fn rule(c: char) -> String {
    c.to_string().repeat(RULE_WIDTH)
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", rule('='));
}

/// First `max_chars` characters of `text`, trimmed, with `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut shown: String = text.chars().take(max_chars).collect();
    let cut = text.chars().nth(max_chars).is_some();
    shown = shown.trim().to_string();
    if cut {
        shown.push_str("...");
    }
    shown
}

/// One-based page label, or `?` for unpaginated sources.
pub fn page_label(page: Option<u32>) -> String {
    page.map_or_else(|| "?".to_string(), |p| (u64::from(p) + 1).to_string())
}

/// One line per file type describing what the loader found.
pub fn format_load_reports(reports: &[TypeLoad]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = match report {
            TypeLoad::Loaded { kind: FileKind::Pdf, count } => {
                writeln!(out, "  - Memuat {count} halaman dari PDF")
            }
            TypeLoad::Loaded { kind, count } => writeln!(out, "  - Memuat {count} file {kind}"),
            TypeLoad::NotFound { kind } => writeln!(out, "  - Tidak ada file {kind}"),
            TypeLoad::Failed { kind, message } => {
                writeln!(out, "  - Gagal memuat file {kind}: {message}")
            }
        };
    }
    out
}

/// Summary printed after `pajak ingest`.
pub fn format_ingest_report(report: &IngestReport, collection: &str) -> String {
    let mut out = format_load_reports(&report.load_reports);
    let _ = writeln!(out, "Total: {} dokumen berhasil dimuat.", report.documents);
    let _ = writeln!(
        out,
        "Berhasil membagi {} dokumen menjadi {} chunks.",
        report.documents, report.chunks
    );
    let _ = writeln!(
        out,
        "Berhasil menyimpan {} chunks ke {collection} dalam {} batch.",
        report.chunks, report.batches
    );
    out
}

/// The answer followed by its numbered sources.
pub fn format_answer(answer: &Answer) -> String {
    let mut out = String::from("\n");
    heading(&mut out, "JAWABAN:");
    let _ = writeln!(out, "{}", answer.text);
    out.push('\n');
    heading(&mut out, "SUMBER REFERENSI:");

    for (i, source) in answer.sources.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n[{}] {} (halaman {}) - Relevance: {:.2}",
            i + 1,
            source.filename,
            page_label(source.page),
            source.relevance_score
        );
        let _ = writeln!(out, "{}", rule('-'));
        let _ = writeln!(out, "{}", preview(&source.text, SOURCE_PREVIEW_CHARS));
    }

    let _ = writeln!(out, "\n{}", rule('='));
    out
}

/// Message for a query whose top result did not pass the threshold.
pub fn format_no_result(best_score: Option<f32>) -> String {
    match best_score {
        Some(score) => format!("Tidak ditemukan hasil yang relevan (skor tertinggi {score:.2})."),
        None => "Tidak ditemukan hasil yang relevan.".to_string(),
    }
}

/// Count, per-source statistics, and the first few chunks of a collection.
pub fn format_snapshot(snapshot: &CollectionSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Collection '{}': {} chunks", snapshot.collection, snapshot.chunks.len());
    out.push('\n');

    heading(&mut out, "Statistics:");
    let _ = writeln!(out, "\nDocuments by source:");
    for (source, count) in &snapshot.source_stats().entries {
        let _ = writeln!(out, "  {source}: {count} chunks");
    }
    out.push('\n');

    heading(&mut out, &format!("Sample Documents (first {SAMPLE_COUNT}):"));
    for (i, chunk) in snapshot.chunks.iter().take(SAMPLE_COUNT).enumerate() {
        let _ = writeln!(out, "\n[{}] ID: {}", i + 1, chunk.id);
        let _ = writeln!(out, "    Source: {}", chunk.metadata.file_name());
        let _ = writeln!(out, "    Page: {}", page_label(chunk.metadata.page));
        let _ = writeln!(out, "    Content: {}", preview(&chunk.text, SAMPLE_PREVIEW_CHARS));
    }
    out
}
