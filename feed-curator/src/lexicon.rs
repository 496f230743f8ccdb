//! Pattern tables used by the scorer, the filter and the diversity manager.
//!
//! The tables are plain data (`LexiconSpec`) so they can be extended from a
//! JSON file; `Lexicon` is the compiled, immutable form shared by the stages.

use crate::types::{Domain, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPatternSpec {
    pub name: String,
    pub pattern: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoveltyCategorySpec {
    pub weight: f64,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologySpec {
    pub name: String,
    pub patterns: Vec<String>,
}

/// Uncompiled pattern tables. Every pattern is matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconSpec {
    pub novelty: BTreeMap<String, NoveltyCategorySpec>,
    pub version_patterns: Vec<String>,
    pub date_patterns: Vec<String>,
    /// Detection table per domain, in tie-break order
    pub technologies: BTreeMap<Domain, Vec<TechnologySpec>>,
    pub code_patterns: Vec<String>,
    pub structure_patterns: Vec<WeightedPatternSpec>,
    pub depth_title_patterns: Vec<String>,
    pub technical_indicators: Vec<WeightedPatternSpec>,
    pub specialized_terms: Vec<String>,
    pub focus_keywords: BTreeMap<String, Vec<String>>,
    pub clickbait_titles: Vec<String>,
    pub generic_titles: Vec<String>,
    pub promotional: Vec<String>,
    pub promo_words: Vec<String>,
    pub technical_vocabulary: Vec<String>,
    pub noise_phrases: Vec<String>,
    pub shortener_hosts: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn weighted(items: &[(&str, &str, f64)]) -> Vec<WeightedPatternSpec> {
    items
        .iter()
        .map(|(name, pattern, weight)| WeightedPatternSpec {
            name: name.to_string(),
            pattern: pattern.to_string(),
            weight: *weight,
        })
        .collect()
}

fn technologies(items: &[(&str, &[&str])]) -> Vec<TechnologySpec> {
    items
        .iter()
        .map(|(name, patterns)| TechnologySpec {
            name: name.to_string(),
            patterns: strings(patterns),
        })
        .collect()
}

impl LexiconSpec {
    pub fn builtin() -> Self {
        let mut novelty = BTreeMap::new();
        for (name, weight, patterns) in [
            ("releases", 0.35, &[
                "released", "announces", "introducing", "launch", "now available",
                "new version", r"v\d+\.\d+", "generally available", "GA release",
            ][..]),
            ("features", 0.25, &[
                "new feature", "now supports", "added support", "experimental",
                "preview", "beta", "alpha", r"\bRFC\b", "proposal",
            ][..]),
            ("breaking", 0.15, &[
                "breaking change", "migration", "deprecated", "removed",
                "discontinued", "end of life", r"\bEOL\b",
            ][..]),
            ("performance", 0.15, &[
                "faster", "performance improvement", "optimized", "reduced",
                "benchmark", "speed up", r"\d+x faster", r"\d+% improvement",
            ][..]),
            ("security", 0.10, &[
                "security update", "vulnerability", r"\bpatch", "CVE-",
                "security fix", "critical update",
            ][..]),
            ("ecosystem", 0.10, &[
                "plugin", "extension", "integration", "compatibility",
                "support for", "works with",
            ][..]),
        ] {
            novelty.insert(
                name.to_string(),
                NoveltyCategorySpec {
                    weight,
                    patterns: strings(patterns),
                },
            );
        }

        let mut tech = BTreeMap::new();
        tech.insert(
            Domain::Frontend,
            technologies(&[
                ("react", &[
                    r"\breact\b", r"\bnext\.?js\b", r"\bgatsby\b", r"\bremix\b", r"\bhooks?\b",
                    r"\bjsx\b", r"\bcomponent\b", r"\bstate\b", r"\busestate\b", r"\buseeffect\b",
                    r"\bvirtual\s+dom\b",
                ]),
                ("vue", &[
                    r"\bvue\b", r"\bnuxt\b", r"\bvuex\b", r"\bpinia\b", r"\bcomposition\s+api\b",
                    r"\boptions\s+api\b", r"\bv-\w+\b",
                ]),
                ("angular", &[
                    r"\bangular\b", r"\brxjs\b", r"\bngrx\b", r"\bzone\.?js\b", r"\btypescript\b",
                    r"\binjection\b", r"\bcomponent\b", r"\bservice\b",
                ]),
                ("svelte", &[r"\bsvelte\b", r"\bsveltekit\b", r"\breactive\b", r"\bstore\b"]),
                ("css", &[
                    r"\bcss\b", r"\bsass\b", r"\bscss\b", r"\btailwind\b", r"\bstyled.components\b",
                    r"\bemotion\b", r"\bflexbox\b", r"\bgrid\b", r"\banimation\b", r"\btransition\b",
                ]),
                ("javascript", &[
                    r"\bjavascript\b", r"\btypescript\b", r"\bes\d+\b", r"\becmascript\b",
                    r"\basync\b", r"\bawait\b", r"\bpromise\b", r"\bclosure\b",
                ]),
                ("tooling", &[
                    r"\bwebpack\b", r"\bvite\b", r"\besbuild\b", r"\brollup\b", r"\bparcel\b",
                    r"\bbabel\b", r"\bbundler\b",
                ]),
                ("testing", &[
                    r"\bjest\b", r"\bvitest\b", r"\bcypress\b", r"\bplaywright\b",
                    r"\btesting.library\b", r"\bunit\s+test\b", r"\be2e\b",
                ]),
                ("mobile", &[
                    r"\breact\s+native\b", r"\bflutter\b", r"\bionic\b", r"\bcapacitor\b",
                    r"\bcordova\b", r"\bmobile\b",
                ]),
                ("performance", &[
                    r"\bperformance\b", r"\boptimiz\w+\b", r"\blighthouse\b",
                    r"\bcore\s+web\s+vitals\b", r"\blazy\s+loading\b", r"\bcaching\b",
                ]),
            ]),
        );
        tech.insert(
            Domain::Backend,
            technologies(&[
                ("nodejs", &[
                    r"\bnode\.?js\b", r"\bexpress\b", r"\bnestjs\b", r"\bfastify\b", r"\bkoa\b",
                    r"\bnpm\b", r"\byarn\b", r"\bv8\b",
                ]),
                ("python", &[
                    r"\bpython\b", r"\bdjango\b", r"\bflask\b", r"\bfastapi\b", r"\bpydantic\b",
                    r"\bsqlalchemy\b", r"\bpip\b", r"\bconda\b",
                ]),
                ("java", &[
                    r"\bjava\b", r"\bspring\b", r"\bboot\b", r"\bquarkus\b", r"\bmicronaut\b",
                    r"\bmaven\b", r"\bgradle\b", r"\bjvm\b",
                ]),
                ("go", &[
                    r"\bgolang\b", r"\bgo\s+\d+\.\d+\b", r"\bgin\b", r"\becho\b", r"\bfiber\b",
                    r"\bgoroutines?\b", r"\bchannel\b",
                ]),
                ("rust", &[
                    r"\brust\b", r"\bactix\b", r"\brocket\b", r"\btokio\b", r"\basync\b",
                    r"\bcargo\b", r"\bborrowing\b", r"\bownership\b",
                ]),
                ("php", &[
                    r"\bphp\b", r"\blaravel\b", r"\bsymfony\b", r"\bcomposer\b", r"\bphp\s+\d+\b",
                    r"\bartisan\b",
                ]),
                ("ruby", &[r"\bruby\b", r"\brails\b", r"\bsinatra\b", r"\bgem\b", r"\bbundler\b"]),
                ("dotnet", &[
                    r"\.net\b", r"\bc#", r"\basp\.net\b", r"\bblazor\b", r"\bentity\s+framework\b",
                    r"\bnuget\b",
                ]),
                ("databases", &[
                    r"\bpostgres\w*\b", r"\bmysql\b", r"\bmongodb\b", r"\bredis\b",
                    r"\belasticsearch\b", r"\bsqlite\b", r"\bcassandra\b", r"\boracle\b",
                ]),
                ("devops", &[
                    r"\bdocker\b", r"\bkubernetes\b", r"\bk8s\b", r"\bhelm\b", r"\bterraform\b",
                    r"\bansible\b", r"\bjenkins\b", r"\bci/cd\b",
                ]),
                ("cloud", &[
                    r"\baws\b", r"\bazure\b", r"\bgcp\b", r"\bserverless\b", r"\blambda\b",
                    r"\bs3\b", r"\bec2\b", r"\brds\b",
                ]),
                ("api", &[
                    r"\brest\b", r"\bgraphql\b", r"\bapi\b", r"\bgrpc\b", r"\bopenapi\b",
                    r"\bswagger\b", r"\bmicroservices?\b",
                ]),
            ]),
        );
        tech.insert(
            Domain::Ai,
            technologies(&[
                ("llms", &[
                    r"\bllms?\b", r"\bgpt\b", r"\bclaude\b", r"\bgemini\b", r"\blanguage\s+models?\b",
                    r"\btransformers?\b", r"\bbert\b", r"\bllama\b",
                ]),
                ("ml_frameworks", &[
                    r"\btensorflow\b", r"\bpytorch\b", r"\bjax\b", r"\bkeras\b",
                    r"\bscikit.learn\b", r"\bxgboost\b", r"\blightgbm\b",
                ]),
                ("nlp", &[
                    r"\bnlp\b", r"\bnatural\s+language\b", r"\bembeddings?\b", r"\btokeniz\w+\b",
                    r"\bsentiment\b", r"\bnamed\s+entity\b",
                ]),
                ("computer_vision", &[
                    r"\bcomputer\s+vision\b", r"\byolo\b", r"\bocr\b", r"\bimage\s+recognition\b",
                    r"\bopencv\b", r"\bcnn\b",
                ]),
                ("mlops", &[
                    r"\bmlops\b", r"\bmlflow\b", r"\bwandb\b", r"\bkubeflow\b",
                    r"\bmodel\s+deployment\b", r"\bmodel\s+monitoring\b",
                ]),
                ("data_science", &[
                    r"\bpandas\b", r"\bnumpy\b", r"\bscipy\b", r"\bjupyter\b", r"\bnotebook\b",
                    r"\bdata\s+analysis\b", r"\bvisualization\b",
                ]),
                ("ai_tools", &[
                    r"\blangchain\b", r"\bhugging\s?face\b", r"\bstable\s+diffusion\b",
                    r"\bmidjourney\b", r"\bautogen\b", r"\bcrewai\b",
                ]),
                ("research", &[
                    r"\barxiv\b", r"\bpaper\b", r"\bresearch\b", r"\bstudy\b", r"\bexperiment\b",
                    r"\bneural\s+networks?\b", r"\bdeep\s+learning\b",
                ]),
                ("ethics", &[
                    r"\bai\s+ethics\b", r"\bbias\b", r"\bfairness\b", r"\bresponsible\s+ai\b",
                    r"\bexplainable\b", r"\binterpretable\b",
                ]),
            ]),
        );
        tech.insert(Domain::General, Vec::new());

        let mut focus_keywords = BTreeMap::new();
        for (focus, keywords) in [
            ("releases", &["release", "version", "launch", "available", "shipped", "announced"][..]),
            ("patterns", &["pattern", "practice", "architecture", "design", "approach"][..]),
            ("optimization", &["performance", "optimize", "fast", "efficient", "speed"][..]),
            ("tutorials", &["how to", "guide", "tutorial", "learn", "getting started"][..]),
            ("ecosystem", &["library", "tool", "framework", "package", "plugin"][..]),
            ("internals", &["internal", "under the hood", "deep dive", "implementation"][..]),
            ("advanced", &["advanced", "expert", "professional", "complex"][..]),
            ("practices", &["practice", "convention", "standard", "guideline"][..]),
            ("features", &["feature", "capability", "functionality", "support"][..]),
            ("security", &["security", "secure", "vulnerability", "safety"][..]),
            ("standards", &["standard", "specification", "rfc", "proposal"][..]),
        ] {
            focus_keywords.insert(focus.to_string(), strings(keywords));
        }

        Self {
            novelty,
            version_patterns: strings(&[r"v?\d+\.\d+\.\d+", r"\d{4}\.\d{1,2}", r"version\s+\d+"]),
            date_patterns: strings(&[
                r"20\d{2}",
                r"january|february|march|april|may|june|july|august|september|october|november|december",
                r"Q[1-4]\s+20\d{2}",
            ]),
            technologies: tech,
            code_patterns: strings(&[
                r"```[\s\S]*?```",
                r"<code>[\s\S]*?</code>",
                r"<pre>[\s\S]*?</pre>",
                r"function\s+\w+\s*\(",
                r"class\s+\w+\s*[:{]",
                r"import\s+\w+",
                r"const\s+\w+\s*=",
            ]),
            structure_patterns: weighted(&[
                ("headers", r"(?m)^#{1,6}\s+\w+", 0.1),
                ("numbered_list", r"(?m)^\d+\.\s+\w+", 0.1),
                ("bullet_list", r"(?m)^\*\s+\w+", 0.1),
                ("dash_list", r"(?m)^-\s+\w+", 0.1),
                ("blockquote", r">\s+\w+", 0.05),
            ]),
            depth_title_patterns: strings(&[
                r"how\s+to", "guide", "tutorial", "implementation", r"deep\s+dive", "comprehensive",
                "complete", "advanced", r"best\s+practices", "patterns", "architecture",
            ]),
            technical_indicators: weighted(&[
                ("implementation", r"implement|implementation|code\s+example|snippet|sample", 0.2),
                ("architecture", r"architecture|design\s+pattern|scalability|microservice", 0.2),
                ("optimization", r"optimize|optimization|performance|benchmark|profiling", 0.15),
                ("best_practice", r"best\s+practice|guideline|recommendation|tip|convention", 0.15),
                ("comparison", r"vs\.|versus|comparison|difference\s+between|compared\s+to", 0.1),
                ("tutorial", r"how\s+to|tutorial|guide|walkthrough|step[\s\-]by[\s\-]step", 0.1),
                ("debugging", r"debug|troubleshoot|error|fix|issue|problem", 0.1),
                ("testing", r"test|testing|unit\s+test|integration|e2e|qa", 0.1),
                ("deployment", r"deploy|deployment|production|ci/cd|devops", 0.1),
                ("security", r"security|secure|vulnerability|authentication|authorization", 0.1),
            ]),
            specialized_terms: strings(&[
                "algorithm", r"data\s+structure", "complexity", "runtime", r"memory\s+management",
                r"garbage\s+collection", "concurrency", "async|await", "promise", "callback",
                "closure", "inheritance", "polymorphism", "encapsulation", "singleton", "factory",
                "observer", "decorator",
            ]),
            focus_keywords,
            clickbait_titles: strings(&[
                r"you\s+won['’]t\s+believe",
                r"this\s+one\s+trick",
                r"shocking",
                r"must\s+read",
                r"click\s+here",
                r"\d+\s+things?\s+you",
                r"hate\s+this",
                r"doctors\s+hate",
                r"amazing\s+secret",
                r"weird\s+trick",
            ]),
            generic_titles: strings(&[
                r"^top\s+\d+$",
                r"^best\s+\w+\s+\d{4}$",
                r"^how\s+to\s+\w+$",
                r"^the\s+\w+\s+guide$",
            ]),
            promotional: strings(&[
                r"sponsored\s+post",
                r"affiliate\s+link",
                r"(buy|purchase)\s+now",
                r"limited\s+time\s+offer",
                r"click\s+here\s+to",
                r"sign\s+up\s+for\s+our",
                r"subscribe\s+to\s+our\s+newsletter",
                r"follow\s+us\s+on",
                r"like\s+and\s+subscribe",
                r"special\s+discount",
                r"exclusive\s+deal",
                r"act\s+now",
                r"don['’]t\s+miss\s+out",
                r"hurry\s+up",
                r"while\s+supplies\s+last",
                r"you\s+need\s+to\s+see\s+this",
                r"this\s+will\s+change\s+your\s+life",
                r"secret\s+that\s+\w+\s+don['’]t\s+want",
                r"industry\s+doesn['’]t\s+want\s+you\s+to\s+know",
                r"earn\s+\$\d+",
                r"make\s+money\s+online",
                r"work\s+from\s+home",
                r"get\s+rich\s+quick",
                r"originally\s+published\s+at",
                r"cross[\s\-]posted\s+from",
                r"reposted\s+from",
                r"read\s+more\s+at",
                r"continue\s+reading\s+at",
                r"full\s+article\s+at",
            ]),
            promo_words: strings(&[
                "buy", "purchase", "sale", "discount", "offer", "deal", "free", "trial", "signup",
                "register", "subscribe", "follow", "like", "share",
            ]),
            technical_vocabulary: strings(&[
                "function", "class", "algorithm", "implementation", "optimize", "performance",
                "security", "architecture", "pattern", "framework", "library", "api", "database",
                "server", "client", "async", "sync", "cache", "scale", "deploy", "test", "debug",
                "refactor", "code", "syntax", "semantic", "protocol", "interface", "abstract",
                "inherit", "polymorphism", "encapsulation", "javascript", "python", "react", "vue",
                "angular", "nodejs", "backend", "frontend", "development", "programming", "rust",
            ]),
            noise_phrases: strings(&[
                "click here", "subscribe now", "follow us", "like and share", "comment below",
                "notification bell", "sponsor", "affiliate link", "advertisement", "promo code",
                "sale ends", "discount expires", "limited time", "buy now", "purchase today",
                "order now", "payment required", "free trial expires", "signup bonus",
                "register today", "login required",
            ]),
            shortener_hosts: strings(&["bit.ly", "tinyurl", "goo.gl", "t.co"]),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Adds every entry of `other` to this table. Same-named novelty categories
    /// and technologies gain the extra patterns; a category weight in `other` wins.
    pub fn merge(&mut self, other: LexiconSpec) {
        for (name, category) in other.novelty {
            match self.novelty.get_mut(&name) {
                Some(existing) => {
                    existing.weight = category.weight;
                    existing.patterns.extend(category.patterns);
                }
                None => {
                    self.novelty.insert(name, category);
                }
            }
        }
        for (domain, techs) in other.technologies {
            let table = self.technologies.entry(domain).or_default();
            for tech in techs {
                match table.iter_mut().find(|t| t.name == tech.name) {
                    Some(existing) => existing.patterns.extend(tech.patterns),
                    None => table.push(tech),
                }
            }
        }
        for (focus, keywords) in other.focus_keywords {
            self.focus_keywords.entry(focus).or_default().extend(keywords);
        }
        self.version_patterns.extend(other.version_patterns);
        self.date_patterns.extend(other.date_patterns);
        self.code_patterns.extend(other.code_patterns);
        self.structure_patterns.extend(other.structure_patterns);
        self.depth_title_patterns.extend(other.depth_title_patterns);
        self.technical_indicators.extend(other.technical_indicators);
        self.specialized_terms.extend(other.specialized_terms);
        self.clickbait_titles.extend(other.clickbait_titles);
        self.generic_titles.extend(other.generic_titles);
        self.promotional.extend(other.promotional);
        self.promo_words.extend(other.promo_words);
        self.technical_vocabulary.extend(other.technical_vocabulary);
        self.noise_phrases.extend(other.noise_phrases);
        self.shortener_hosts.extend(other.shortener_hosts);
    }
}

#[derive(Debug, Clone)]
pub struct WeightedPattern {
    pub name: String,
    pub regex: Regex,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct NoveltyCategory {
    pub name: String,
    pub weight: f64,
    pub patterns: Vec<Regex>,
}

#[derive(Debug, Clone)]
pub struct TechnologyPatterns {
    pub name: String,
    pub patterns: Vec<Regex>,
}

/// Compiled pattern tables
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub novelty: Vec<NoveltyCategory>,
    pub version_patterns: Vec<Regex>,
    pub date_patterns: Vec<Regex>,
    technologies: HashMap<Domain, Vec<TechnologyPatterns>>,
    pub code_patterns: Vec<Regex>,
    pub structure_patterns: Vec<WeightedPattern>,
    pub depth_title_patterns: Vec<Regex>,
    pub technical_indicators: Vec<WeightedPattern>,
    pub specialized_terms: Vec<Regex>,
    focus_keywords: HashMap<String, Vec<String>>,
    pub clickbait_titles: Vec<Regex>,
    pub generic_titles: Vec<Regex>,
    pub promotional: Vec<Regex>,
    pub promo_words: HashSet<String>,
    pub technical_vocabulary: Regex,
    pub noise_phrases: Regex,
    pub shortener_hosts: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p)).collect()
}

fn compile_weighted(patterns: &[WeightedPatternSpec]) -> Result<Vec<WeightedPattern>> {
    patterns
        .iter()
        .map(|spec| {
            Ok(WeightedPattern {
                name: spec.name.clone(),
                regex: compile(&spec.pattern)?,
                weight: spec.weight,
            })
        })
        .collect()
}

/// One alternation of literal words or phrases, bounded on both sides
fn compile_alternation(items: &[String]) -> Result<Regex> {
    let escaped: Vec<String> = items.iter().map(|item| regex::escape(item)).collect();
    if escaped.is_empty() {
        // Never matches
        return compile(r"\b\B");
    }
    compile(&format!(r"\b(?:{})\b", escaped.join("|")))
}

impl Lexicon {
    pub fn compile(spec: &LexiconSpec) -> Result<Self> {
        let novelty = spec
            .novelty
            .iter()
            .map(|(name, category)| {
                Ok(NoveltyCategory {
                    name: name.clone(),
                    weight: category.weight,
                    patterns: compile_all(&category.patterns)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut technologies = HashMap::new();
        for (domain, techs) in &spec.technologies {
            let compiled = techs
                .iter()
                .map(|tech| {
                    Ok(TechnologyPatterns {
                        name: tech.name.to_lowercase(),
                        patterns: compile_all(&tech.patterns)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            technologies.insert(*domain, compiled);
        }

        let focus_keywords = spec
            .focus_keywords
            .iter()
            .map(|(focus, keywords)| {
                (focus.to_lowercase(), keywords.iter().map(|k| k.to_lowercase()).collect())
            })
            .collect();

        Ok(Self {
            novelty,
            version_patterns: compile_all(&spec.version_patterns)?,
            date_patterns: compile_all(&spec.date_patterns)?,
            technologies,
            code_patterns: compile_all(&spec.code_patterns)?,
            structure_patterns: compile_weighted(&spec.structure_patterns)?,
            depth_title_patterns: compile_all(&spec.depth_title_patterns)?,
            technical_indicators: compile_weighted(&spec.technical_indicators)?,
            specialized_terms: compile_all(&spec.specialized_terms)?,
            focus_keywords,
            clickbait_titles: compile_all(&spec.clickbait_titles)?,
            generic_titles: compile_all(&spec.generic_titles)?,
            promotional: compile_all(&spec.promotional)?,
            promo_words: spec.promo_words.iter().map(|w| w.to_lowercase()).collect(),
            technical_vocabulary: compile_alternation(&spec.technical_vocabulary)?,
            noise_phrases: compile_alternation(&spec.noise_phrases)?,
            shortener_hosts: compile_alternation(&spec.shortener_hosts)?,
        })
    }

    pub fn builtin() -> Result<Self> {
        Self::compile(&LexiconSpec::builtin())
    }

    /// Built-in tables, extended by the JSON file at `path` when one is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut spec = LexiconSpec::builtin();
        if let Some(path) = path {
            info!("Merging lexicon entries from {}", path.display());
            spec.merge(LexiconSpec::from_file(path)?);
        }
        Self::compile(&spec)
    }

    /// Technology table for a domain; empty for domains without one
    pub fn technologies(&self, domain: Domain) -> &[TechnologyPatterns] {
        self.technologies.get(&domain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_technology(&self, domain: Domain, name: &str) -> bool {
        self.technologies(domain).iter().any(|t| t.name == name)
    }

    /// Keywords expected from a source with the given focus. Unknown focus
    /// values are split on `-` into their own keyword list.
    pub fn focus_keywords(&self, focus: &str) -> Vec<String> {
        let focus = focus.trim().to_lowercase();
        match self.focus_keywords.get(&focus) {
            Some(keywords) => keywords.clone(),
            None => focus
                .split('-')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}
