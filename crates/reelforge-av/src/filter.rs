//! Typed construction of ffmpeg `-filter_complex` graphs.
//!
//! Graphs are assembled from [`FilterChain`]s of typed [`Filter`] nodes and
//! only turned into ffmpeg's textual syntax by their `Display` impls.
//! [`FilterGraph::push`] rejects label collisions and references to labels
//! that no earlier chain produced.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Kind of an input file's stream, as used in `[0:v]` / `[1:a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn as_char(self) -> char {
        match self {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
        }
    }
}

/// A filter pad: either a stream of an input file or a named link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadRef {
    Input { index: usize, kind: StreamKind },
    Label(String),
}

impl PadRef {
    pub fn video(index: usize) -> Self {
        PadRef::Input {
            index,
            kind: StreamKind::Video,
        }
    }

    pub fn audio(index: usize) -> Self {
        PadRef::Input {
            index,
            kind: StreamKind::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        PadRef::Label(name.into())
    }
}

impl fmt::Display for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadRef::Input { index, kind } => write!(f, "[{}:{}]", index, kind.as_char()),
            PadRef::Label(name) => write!(f, "[{}]", name),
        }
    }
}

/// How `amix` decides the output length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixDuration {
    Longest,
    Shortest,
    First,
}

impl MixDuration {
    fn as_str(self) -> &'static str {
        match self {
            MixDuration::Longest => "longest",
            MixDuration::Shortest => "shortest",
            MixDuration::First => "first",
        }
    }
}

/// A single filter node.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Scale to fit inside the box, preserving aspect ratio.
    Scale { width: u32, height: u32 },
    /// Pad to the exact size, centering the frame.
    Pad { width: u32, height: u32 },
    Fps(f64),
    /// Video passthrough.
    Null,
    /// Audio passthrough.
    ANull,
    Volume(f64),
    Amix { inputs: usize, duration: MixDuration },
    Concat { segments: usize, video: usize, audio: usize },
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Scale { width, height } => write!(
                f,
                "scale={}:{}:force_original_aspect_ratio=decrease",
                width, height
            ),
            Filter::Pad { width, height } => {
                write!(f, "pad={}:{}:(ow-iw)/2:(oh-ih)/2", width, height)
            }
            Filter::Fps(fps) => write!(f, "fps={}", fps),
            Filter::Null => f.write_str("null"),
            Filter::ANull => f.write_str("anull"),
            Filter::Volume(v) => write!(f, "volume={}", v),
            Filter::Amix { inputs, duration } => {
                write!(f, "amix=inputs={}:duration={}", inputs, duration.as_str())
            }
            Filter::Concat {
                segments,
                video,
                audio,
            } => write!(f, "concat=n={}:v={}:a={}", segments, video, audio),
        }
    }
}

/// Input pads, a linear sequence of filters, and output labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    inputs: Vec<PadRef>,
    filters: Vec<Filter>,
    outputs: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, pad: PadRef) -> Self {
        self.inputs.push(pad);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn output(mut self, label: impl Into<String>) -> Self {
        self.outputs.push(label.into());
        self
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{}", pad)?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", filter)?;
        }
        for label in &self.outputs {
            write!(f, "[{}]", label)?;
        }
        Ok(())
    }
}

/// A complete filter graph: chains separated by `;`.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
    labels: HashSet<String>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chain.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the chain has no filters, consumes a label
    /// no earlier chain produced, or produces a label that already exists.
    pub fn push(&mut self, chain: FilterChain) -> Result<&mut Self> {
        if chain.filters.is_empty() {
            return Err(Error::InvalidInput(
                "filter chain has no filters".to_string(),
            ));
        }
        for pad in &chain.inputs {
            if let PadRef::Label(name) = pad {
                if !self.labels.contains(name) {
                    return Err(Error::InvalidInput(format!(
                        "filter graph references unknown label [{}]",
                        name
                    )));
                }
            }
        }
        let mut produced = HashSet::new();
        for label in &chain.outputs {
            if self.labels.contains(label) || !produced.insert(label.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate filter graph label [{}]",
                    label
                )));
            }
        }
        self.labels.extend(chain.outputs.iter().cloned());
        self.chains.push(chain);
        Ok(self)
    }

    /// Whether some chain produces `label`.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}", chain)?;
        }
        Ok(())
    }
}

/// A target frame size parsed from `"WxH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("invalid resolution '{}', expected WxH", s));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn chain_renders_pads_filters_and_labels() {
        let chain = FilterChain::new()
            .input(PadRef::video(2))
            .filter(Filter::Scale {
                width: 1280,
                height: 720,
            })
            .filter(Filter::Pad {
                width: 1280,
                height: 720,
            })
            .filter(Filter::Fps(29.97))
            .output("v2");
        assert_eq!(
            chain.to_string(),
            "[2:v]scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2,fps=29.97[v2]"
        );
    }

    #[test]
    fn graph_joins_chains_with_semicolons() {
        let mut graph = FilterGraph::new();
        graph
            .push(
                FilterChain::new()
                    .input(PadRef::audio(0))
                    .filter(Filter::Volume(0.5))
                    .output("orig"),
            )
            .unwrap()
            .push(
                FilterChain::new()
                    .input(PadRef::audio(1))
                    .filter(Filter::Volume(1.0))
                    .output("bgm"),
            )
            .unwrap()
            .push(
                FilterChain::new()
                    .input(PadRef::label("orig"))
                    .input(PadRef::label("bgm"))
                    .filter(Filter::Amix {
                        inputs: 2,
                        duration: MixDuration::First,
                    })
                    .output("aout"),
            )
            .unwrap();
        assert_eq!(
            graph.to_string(),
            "[0:a]volume=0.5[orig];[1:a]volume=1[bgm];[orig][bgm]amix=inputs=2:duration=first[aout]"
        );
        assert!(graph.has_label("aout"));
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut graph = FilterGraph::new();
        graph
            .push(FilterChain::new().input(PadRef::video(0)).filter(Filter::Null).output("v0"))
            .unwrap();
        let err = graph
            .push(FilterChain::new().input(PadRef::video(1)).filter(Filter::Null).output("v0"))
            .unwrap_err();
        assert_matches!(err, Error::InvalidInput(msg) if msg.contains("[v0]"));
    }

    #[test]
    fn unknown_label_is_rejected() {
        let mut graph = FilterGraph::new();
        let result = graph.push(
            FilterChain::new()
                .input(PadRef::label("nowhere"))
                .filter(Filter::ANull)
                .output("a"),
        );
        assert_matches!(result, Err(Error::InvalidInput(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn resolution_parsing() {
        assert_eq!("1920x1080".parse::<Resolution>().unwrap(), Resolution::new(1920, 1080));
        assert_eq!(" 640X480 ".parse::<Resolution>().unwrap(), Resolution::new(640, 480));
        assert_eq!(Resolution::new(1280, 720).to_string(), "1280x720");
        assert!("1920".parse::<Resolution>().is_err());
        assert!("0x1080".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }
}
