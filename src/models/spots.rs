//! # 衍射斑点图样
//!
//! 束流编号到对称群、超结构标记和规范名称的映射。
//! 束流编号就是斑点在图样中的下标，规范顺序即编号升序。
//!
//! ## 依赖关系
//! - 被 `parsers/spots.rs` 构造
//! - 被 `rfactor/symmetry.rs`, `rfactor/correspondence.rs`, `rfactor/aggregate.rs` 使用
//! - 使用 `regex` 解析束流指数

use regex::Regex;
use std::sync::OnceLock;

/// 对称群归属
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymmetryGroup {
    /// 尚未确定
    Unknown,
    /// 属于第 g 个对称等价群
    Member(u32),
    /// 按对称性应消光（原属第 g 群）
    Forbidden(u32),
}

impl SymmetryGroup {
    /// 从整数编码解析：负数表示消光，`None` 表示未知
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            None => SymmetryGroup::Unknown,
            Some(g) if g < 0 => SymmetryGroup::Forbidden(g.unsigned_abs() as u32),
            Some(g) => SymmetryGroup::Member(g as u32),
        }
    }
}

/// 单个斑点
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    pub name: String,
    pub group: SymmetryGroup,
    pub superstructure: bool,
}

impl Spot {
    pub fn new(name: impl Into<String>, group: SymmetryGroup, superstructure: bool) -> Self {
        Spot {
            name: name.into(),
            group,
            superstructure,
        }
    }
}

/// 斑点图样
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpotPattern {
    spots: Vec<Spot>,
}

impl SpotPattern {
    pub fn new(spots: Vec<Spot>) -> Self {
        SpotPattern { spots }
    }

    /// 仅由束流名称构造：对称群未知，超结构由分数指数推断
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let spots = names
            .iter()
            .map(|n| {
                let name = n.as_ref();
                let superstructure = parse_beam_indices(name)
                    .map(|(h, k)| !is_integer(h) || !is_integer(k))
                    .unwrap_or(false);
                Spot::new(name, SymmetryGroup::Unknown, superstructure)
            })
            .collect();
        SpotPattern { spots }
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn spot(&self, id: usize) -> Option<&Spot> {
        self.spots.get(id)
    }

    /// 规范名称；图样之外的编号用 `#id`
    pub fn name(&self, id: usize) -> String {
        self.spot(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    }

    pub fn group(&self, id: usize) -> SymmetryGroup {
        self.spot(id)
            .map(|s| s.group)
            .unwrap_or(SymmetryGroup::Unknown)
    }

    pub fn is_superstructure(&self, id: usize) -> bool {
        self.spot(id).map(|s| s.superstructure).unwrap_or(false)
    }

    /// 图样中是否存在对称群信息
    pub fn has_groups(&self) -> bool {
        self.spots
            .iter()
            .any(|s| matches!(s.group, SymmetryGroup::Member(_)))
    }

    pub fn has_superstructure(&self) -> bool {
        self.spots.iter().any(|s| s.superstructure)
    }

    /// 对称群 g 的第一个束流编号（该群的代表）
    pub fn first_in_group(&self, g: u32) -> Option<usize> {
        self.spots
            .iter()
            .position(|s| s.group == SymmetryGroup::Member(g))
    }

    /// 按名称查找束流编号（忽略括号、空格和分隔符写法的差异）
    pub fn id_of(&self, name: &str) -> Option<usize> {
        let key = normalize_beam_name(name);
        self.spots
            .iter()
            .position(|s| normalize_beam_name(&s.name) == key)
    }
}

fn beam_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\(?\s*([+-]?\d+(?:\.\d+)?(?:/\d+)?)\s*[|,;\s]\s*([+-]?\d+(?:\.\d+)?(?:/\d+)?)\s*\)?$")
            .expect("beam name pattern is valid")
    })
}

/// 解析 "(1/2|-1)", "1,0", "0.5 0" 等写法的束流指数
pub fn parse_beam_indices(name: &str) -> Option<(f64, f64)> {
    let caps = beam_name_regex().captures(name.trim())?;
    let h = parse_index(caps.get(1)?.as_str())?;
    let k = parse_index(caps.get(2)?.as_str())?;
    Some((h, k))
}

fn parse_index(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => s.parse().ok(),
    }
}

fn is_integer(x: f64) -> bool {
    (x - x.round()).abs() < 1e-6
}

/// 名称归一化：可解析的指数写成 "h|k"，否则去掉空白
fn normalize_beam_name(name: &str) -> String {
    match parse_beam_indices(name) {
        Some((h, k)) => format!("{}|{}", fmt_index(h), fmt_index(k)),
        None => name.split_whitespace().collect::<String>(),
    }
}

fn fmt_index(x: f64) -> String {
    let rounded = (x * 1e4).round() / 1e4;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}
