use crate::models::{top_level, FileRecord, ImportSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Modules compiled into CPython (`sys.builtin_module_names` on a Linux build)
const BUILTIN_MODULES: &[&str] = &[
    "_abc", "_ast", "_codecs", "_collections", "_functools", "_imp", "_io",
    "_locale", "_operator", "_signal", "_sre", "_stat", "_string", "_symtable",
    "_thread", "_tokenize", "_tracemalloc", "_typing", "_warnings", "_weakref",
    "atexit", "builtins", "errno", "faulthandler", "gc", "itertools", "marshal",
    "posix", "pwd", "sys", "time", "xxsubtype",
];

/// Top-level standard library modules shipped as ordinary files by CPython 3.6
/// through 3.13, including modules later versions removed
const STDLIB_MODULES: &[&str] = &[
    // A-B
    "__future__", "abc", "aifc", "antigravity", "argparse", "array", "ast",
    "asynchat", "asyncio", "asyncore", "audioop", "base64", "bdb", "binascii",
    "binhex", "bisect", "bz2",
    // C
    "calendar", "cgi", "cgitb", "chunk", "cmath", "cmd", "code", "codecs",
    "codeop", "collections", "colorsys", "compileall", "concurrent",
    "configparser", "contextlib", "contextvars", "copy", "copyreg", "cProfile",
    "crypt", "csv", "ctypes", "curses",
    // D-E
    "dataclasses", "datetime", "dbm", "decimal", "difflib", "dis", "distutils",
    "doctest", "dummy_threading", "email", "encodings", "ensurepip", "enum",
    // F-G
    "fcntl", "filecmp", "fileinput", "fnmatch", "formatter", "fractions", "ftplib",
    "functools", "genericpath", "getopt", "getpass", "gettext", "glob",
    "graphlib", "grp", "gzip",
    // H-I
    "hashlib", "heapq", "hmac", "html", "http", "idlelib", "imaplib", "imghdr",
    "imp", "importlib", "inspect", "io", "ipaddress",
    // J-L
    "json", "keyword", "lib2to3", "linecache", "locale", "logging", "lzma",
    // M-N
    "macpath", "mailbox", "mailcap", "math", "mimetypes", "mmap", "modulefinder",
    "msilib", "msvcrt",
    "multiprocessing", "netrc", "nis", "nntplib", "ntpath", "nturl2path",
    "numbers",
    // O-P
    "opcode", "operator", "optparse", "os", "ossaudiodev", "parser", "pathlib", "pdb",
    "pickle", "pickletools", "pipes", "pkgutil", "platform", "plistlib",
    "poplib", "posixpath", "pprint", "profile", "pstats", "pty", "py_compile",
    "pyclbr", "pydoc", "pydoc_data", "pyexpat",
    // Q-R
    "queue", "quopri", "random", "re", "readline", "reprlib", "resource",
    "rlcompleter", "runpy",
    // S
    "sched", "secrets", "select", "selectors", "shelve", "shlex", "shutil",
    "signal", "site", "smtpd", "smtplib", "sndhdr", "socket", "socketserver",
    "spwd", "sqlite3", "sre_compile", "sre_constants", "sre_parse", "ssl",
    "stat", "statistics", "string", "stringprep", "struct", "subprocess",
    "sunau", "symbol", "symtable", "sysconfig", "syslog",
    // T
    "tabnanny", "tarfile", "telnetlib", "tempfile", "termios", "test",
    "textwrap", "this", "threading", "timeit", "tkinter", "token", "tokenize",
    "tomllib", "trace", "traceback", "tracemalloc", "tty", "turtle",
    "turtledemo", "types", "typing",
    // U-Z
    "unicodedata", "unittest", "urllib", "uu", "uuid", "venv", "warnings",
    "wave", "weakref", "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib",
    "xml", "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
];

/// Which modules count as standard library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdlibPolicy {
    /// Builtins plus every module shipped with the interpreter
    #[default]
    Full,
    /// Only modules compiled into the interpreter. Pure-Python stdlib modules
    /// such as `os` or `json` survive the filter under this policy.
    Builtin,
}

/// Registry answering whether a top-level module ships with the runtime
pub trait StdlibRegistry {
    fn is_stdlib(&self, module: &str) -> bool;
}

/// Compiled-in modules only
#[derive(Debug, Clone)]
pub struct BuiltinModules {
    names: HashSet<String>,
}

impl BuiltinModules {
    /// Use names reported by a live interpreter
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for BuiltinModules {
    fn default() -> Self {
        Self::from_names(BUILTIN_MODULES.iter().copied())
    }
}

impl StdlibRegistry for BuiltinModules {
    fn is_stdlib(&self, module: &str) -> bool {
        self.names.contains(module)
    }
}

/// Full standard library: builtins plus the shipped module list
#[derive(Debug, Clone)]
pub struct FullStdlib {
    builtins: BuiltinModules,
    modules: HashSet<&'static str>,
}

impl FullStdlib {
    pub fn new(builtins: BuiltinModules) -> Self {
        Self {
            builtins,
            modules: STDLIB_MODULES.iter().copied().collect(),
        }
    }
}

impl Default for FullStdlib {
    fn default() -> Self {
        Self::new(BuiltinModules::default())
    }
}

impl StdlibRegistry for FullStdlib {
    fn is_stdlib(&self, module: &str) -> bool {
        self.modules.contains(module) || self.builtins.is_stdlib(module)
    }
}

/// Build the registry for a policy, preferring builtins reported by the host interpreter
pub fn stdlib_registry(
    policy: StdlibPolicy,
    host_builtins: Option<Vec<String>>,
) -> Box<dyn StdlibRegistry> {
    let builtins = host_builtins
        .map(BuiltinModules::from_names)
        .unwrap_or_default();
    match policy {
        StdlibPolicy::Full => Box::new(FullStdlib::new(builtins)),
        StdlibPolicy::Builtin => Box::new(builtins),
    }
}

/// Module names provided by the project's own files (`utils.py` -> `utils`)
pub fn local_modules(records: &[FileRecord]) -> BTreeSet<String> {
    records
        .iter()
        .map(|record| record.local_module().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Outcome of filtering the scanned imports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub local_modules: BTreeSet<String>,
    /// Imports that matched a project file
    pub local: BTreeSet<String>,
    /// Imports that ship with the runtime
    pub stdlib: BTreeSet<String>,
    /// Everything else: external dependency candidates
    pub candidates: BTreeSet<String>,
}

/// Split every recorded import into local, standard library and external candidates.
///
/// Records hold cumulative snapshots, so names are revisited once per later
/// record; the set union makes that harmless.
pub fn classify(records: &[FileRecord], registry: &dyn StdlibRegistry) -> Classification {
    let local_modules = local_modules(records);
    let mut local = BTreeSet::new();
    let mut remaining = ImportSet::new();

    for record in records {
        for import in &record.cumulative {
            let name = top_level(import);
            if name.is_empty() {
                continue;
            }
            if local_modules.contains(name) {
                local.insert(name.to_string());
            } else {
                remaining.insert(name.to_string());
            }
        }
    }

    let (stdlib, candidates): (BTreeSet<String>, BTreeSet<String>) = remaining
        .into_iter()
        .partition(|name| registry.is_stdlib(name));

    Classification {
        local_modules,
        local,
        stdlib,
        candidates,
    }
}

/// External dependency candidates: imports that are neither local nor standard library
pub fn filter_candidates(records: &[FileRecord], registry: &dyn StdlibRegistry) -> BTreeSet<String> {
    classify(records, registry).candidates
}
