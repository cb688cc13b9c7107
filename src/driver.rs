//! Batch driver: translates many declarations on a worker pool, caches results
//! by structural fingerprint and runs the optional bytecode step.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::bytecode::{embed_bytecode, CancellationToken, DxcCommandCompiler, NativeCompiler};
use crate::diagnostics::Diagnostic;
use crate::fingerprint::{compute_fingerprint, source_spans, to_hex, Fingerprint};
use crate::syntax::{ShaderAttributes, ShaderSource, Span};
use crate::translator::{translate, TranslateOptions, Translation};

#[derive(Clone)]
struct CacheEntry {
    translation: Translation,
    spans: Vec<Span>,
}

/// Completed translations keyed by fingerprint, shared between workers.
///
/// Entries remember the spans of the source they were built from, so a hit for
/// a source whose code only moved reports diagnostics at the new positions.
#[derive(Clone, Default)]
pub struct TranslationCache {
    entries: Arc<Mutex<HashMap<Fingerprint, CacheEntry>>>,
}

impl TranslationCache {
    pub fn get(&self, key: &Fingerprint, spans: &[Span]) -> Option<Translation> {
        let Ok(entries) = self.entries.lock() else {
            return None;
        };
        let entry = entries.get(key)?;
        let mut translation = entry.translation.clone();
        relocate_diagnostics(&mut translation.diagnostics, &entry.spans, spans);
        Some(translation)
    }

    pub fn insert(&self, key: Fingerprint, translation: Translation, spans: Vec<Span>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, CacheEntry { translation, spans });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Moves diagnostic locations from `cached` spans to the matching `current` ones.
/// When several nodes shared a span, the first one wins.
fn relocate_diagnostics(diagnostics: &mut [Diagnostic], cached: &[Span], current: &[Span]) {
    if cached == current {
        return;
    }
    let mut moved: HashMap<Span, Span> = HashMap::new();
    for (old, new) in cached.iter().zip(current) {
        if *old != Span::default() {
            moved.entry(*old).or_insert(*new);
        }
    }
    for diagnostic in diagnostics {
        let at = Span {
            line: diagnostic.location.line,
            column: diagnostic.location.column,
        };
        if let Some(new) = moved.get(&at) {
            diagnostic.location.line = new.line;
            diagnostic.location.column = new.column;
        }
    }
}

pub struct Driver {
    options: TranslateOptions,
    jobs: usize,
    cache: TranslationCache,
    compiler: Option<Arc<dyn NativeCompiler>>,
    cancel: CancellationToken,
}

impl Driver {
    pub fn new(options: TranslateOptions, jobs: usize) -> Self {
        let compiler: Option<Arc<dyn NativeCompiler>> = options.emit_bytecode.then(|| {
            let compiler = match &options.compiler_path {
                Some(path) => DxcCommandCompiler::new(path.clone()),
                None => DxcCommandCompiler::default(),
            };
            Arc::new(compiler) as Arc<dyn NativeCompiler>
        });
        Self {
            options,
            jobs: jobs.max(1),
            cache: TranslationCache::default(),
            compiler,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn NativeCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn translate_one(&self, source: &ShaderSource) -> Translation {
        let key = compute_fingerprint(source, &self.options);
        let spans = source_spans(source);
        if let Some(hit) = self.cache.get(&key, &spans) {
            tracing::debug!(shader = %source.name, fingerprint = %to_hex(&key), "cache hit");
            return hit;
        }

        let mut translation = translate(source, &self.options);
        if self.options.emit_bytecode {
            if let Some(compiler) = &self.compiler {
                embed_bytecode(
                    &mut translation,
                    source.attributes.profile.as_deref(),
                    source.attributes.compile_options.to_args(),
                    compiler.as_ref(),
                    &self.cancel,
                );
            }
        }
        self.cache.insert(key, translation.clone(), spans);
        translation
    }

    /// Translate every source, in parallel, returning results in input order.
    pub fn translate_all(&self, sources: &[ShaderSource]) -> Vec<Translation> {
        let workers = self.jobs.min(sources.len()).max(1);
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<usize>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Translation)>();
        for index in 0..sources.len() {
            let _ = job_tx.send(index);
        }
        drop(job_tx);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for index in job_rx.iter() {
                        let translation = self.translate_one(&sources[index]);
                        if result_tx.send((index, translation)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<Translation>> = vec![None; sources.len()];
        for (index, translation) in result_rx.iter() {
            slots[index] = Some(translation);
        }
        slots.into_iter().flatten().collect()
    }
}

/// Scratch text buffer shared by registration blob builders.
static REGISTRATION_SCRATCH: Mutex<String> = Mutex::new(String::new());

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Effect registration XML for a shader with effect inputs.
pub fn effect_registration_xml(name: &str, attributes: &ShaderAttributes) -> String {
    // Cleared before use, so a poisoned lock is still usable.
    let mut scratch = REGISTRATION_SCRATCH
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    scratch.clear();

    let name = xml_escape(name);
    let _ = writeln!(scratch, "<?xml version='1.0'?>");
    let _ = writeln!(scratch, "<Effect>");
    let _ = writeln!(scratch, "    <Property name='DisplayName' type='string' value='{name}'/>");
    let _ = writeln!(scratch, "    <Property name='Author' type='string' value='hlsl-forge'/>");
    let _ = writeln!(scratch, "    <Property name='Category' type='string' value='Stylize'/>");
    let _ = writeln!(scratch, "    <Property name='Description' type='string' value='{name}'/>");
    let _ = writeln!(scratch, "    <Inputs>");
    for i in 0..attributes.input_count.unwrap_or(0) {
        let _ = writeln!(scratch, "        <Input name='Source{i}'/>");
    }
    let _ = writeln!(scratch, "    </Inputs>");
    let _ = writeln!(scratch, "</Effect>");
    scratch.clone()
}
