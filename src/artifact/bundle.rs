//! CommonJS script bundler.
//!
//! Starting from an entry script, every relative `require('...')` is
//! resolved against the requiring file and inlined, so the bundle runs with
//! no module loader and no file access. One path can be registered as the
//! generated data module: it is never read or scanned, its body is streamed
//! in while the bundle is written.

use crate::utils::error::AssemblyError;
use log::debug;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

const PRELUDE: &str = r#"(function (modules, entry) {
  var cache = {};
  function load(id) {
    if (cache[id]) return cache[id].exports;
    var module = cache[id] = { exports: {} };
    var definition = modules[id];
    definition[0].call(module.exports, function (name) {
      var dep = definition[1][name];
      if (dep === undefined) throw new Error("Cannot find module '" + name + "'");
      return load(dep);
    }, module, module.exports);
    return module.exports;
  }
  load(entry);
})({
"#;

fn require_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\brequire\s*\(\s*(?:'([^'\n]+)'|"([^"\n]+)")\s*\)"#)
            .unwrap_or_else(|e| panic!("invalid require pattern: {}", e))
    })
}

#[derive(Debug)]
enum ModuleBody {
    Script(String),
    Json(String),
    Generated,
}

#[derive(Debug)]
struct Module {
    path: PathBuf,
    body: ModuleBody,
    deps: BTreeMap<String, usize>,
}

/// A resolved module graph, ready to be written
#[derive(Debug)]
pub struct Bundle {
    modules: Vec<Module>,
}

impl Bundle {
    /// Resolve the static dependency graph of `entry`
    ///
    /// **Public** - runs before any output is written so a broken script
    /// tree fails fast
    ///
    /// # Arguments
    /// * `entry` - entry script; becomes module 0
    /// * `generated` - path of the data module, excluded from parsing
    ///
    /// # Errors
    /// * `AssemblyError::ReadAsset` - a module could not be read
    /// * `AssemblyError::UnresolvedModule` - a relative require has no target
    pub fn resolve(entry: &Path, generated: &Path) -> Result<Self, AssemblyError> {
        let generated = normalize(generated);
        let mut modules: Vec<Module> = Vec::new();
        let mut ids: HashMap<PathBuf, usize> = HashMap::new();
        let mut queue: VecDeque<usize> = VecDeque::new();

        let entry = normalize(entry);
        ids.insert(entry.clone(), 0);
        modules.push(load_module(entry, &generated)?);
        queue.push_back(0);

        while let Some(id) = queue.pop_front() {
            let ModuleBody::Script(source) = &modules[id].body else {
                continue;
            };

            let mut deps = BTreeMap::new();
            for specifier in required_specifiers(source) {
                if !is_relative(&specifier) {
                    debug!("Leaving require('{}') to the runtime", specifier);
                    continue;
                }
                let resolved = resolve_specifier(&modules[id].path, &specifier, &generated)?;
                let dep_id = match ids.get(&resolved) {
                    Some(&dep_id) => dep_id,
                    None => {
                        let dep_id = modules.len();
                        ids.insert(resolved.clone(), dep_id);
                        modules.push(load_module(resolved, &generated)?);
                        queue.push_back(dep_id);
                        dep_id
                    }
                };
                deps.insert(specifier, dep_id);
            }
            modules[id].deps = deps;
        }

        debug!("Bundle resolved: {} modules", modules.len());
        Ok(Self { modules })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Whether the generated data module is reachable from the entry
    pub fn includes_generated(&self) -> bool {
        self.modules
            .iter()
            .any(|module| matches!(module.body, ModuleBody::Generated))
    }

    /// Write the bundle, calling `generated` to stream the data module body
    ///
    /// `generated` is called at most once, when the data module is reached.
    pub fn write<W, F>(&self, out: &mut W, generated: F) -> Result<(), AssemblyError>
    where
        W: Write,
        F: FnOnce(&mut W) -> Result<(), AssemblyError>,
    {
        let mut generated = Some(generated);

        out.write_all(PRELUDE.as_bytes())?;
        for (id, module) in self.modules.iter().enumerate() {
            writeln!(out, "{}: [function (require, module, exports) {{", id)?;
            match &module.body {
                ModuleBody::Script(source) => {
                    out.write_all(source.as_bytes())?;
                }
                ModuleBody::Json(source) => {
                    out.write_all(b"module.exports = ")?;
                    out.write_all(source.trim_end().as_bytes())?;
                    out.write_all(b";")?;
                }
                ModuleBody::Generated => {
                    out.write_all(b"module.exports = ")?;
                    if let Some(generated) = generated.take() {
                        generated(out)?;
                    }
                    out.write_all(b";")?;
                }
            }
            let deps = serde_json::to_string(&module.deps)?;
            write!(out, "\n}}, {}],\n", deps)?;
        }
        out.write_all(b"}, 0);\n")?;
        Ok(())
    }
}

fn load_module(path: PathBuf, generated: &Path) -> Result<Module, AssemblyError> {
    let body = if path == generated {
        ModuleBody::Generated
    } else {
        let source = std::fs::read_to_string(&path).map_err(|source| AssemblyError::ReadAsset {
            path: path.clone(),
            source,
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            ModuleBody::Json(source)
        } else {
            ModuleBody::Script(source)
        }
    };
    Ok(Module {
        path,
        body,
        deps: BTreeMap::new(),
    })
}

/// Specifiers of every `require('...')` call, in source order, without duplicates
fn required_specifiers(source: &str) -> Vec<String> {
    let mut specifiers: Vec<String> = Vec::new();
    for captures in require_pattern().captures_iter(source) {
        let Some(specifier) = captures.get(1).or_else(|| captures.get(2)) else {
            continue;
        };
        let specifier = specifier.as_str().to_string();
        if !specifiers.contains(&specifier) {
            specifiers.push(specifier);
        }
    }
    specifiers
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// Node-style file resolution: exact, `.js`, `.json`, then `index.js`
fn resolve_specifier(
    from: &Path,
    specifier: &str,
    generated: &Path,
) -> Result<PathBuf, AssemblyError> {
    let base = from.parent().unwrap_or_else(|| Path::new(""));
    let target = normalize(&base.join(specifier));

    let candidates = [
        target.clone(),
        append_extension(&target, "js"),
        append_extension(&target, "json"),
        target.join("index.js"),
    ];

    candidates
        .into_iter()
        .find(|candidate| candidate == generated || candidate.is_file())
        .ok_or_else(|| AssemblyError::UnresolvedModule {
            specifier: specifier.to_string(),
            from: from.to_path_buf(),
        })
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Lexically remove `.` and `..` components; the path need not exist
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
