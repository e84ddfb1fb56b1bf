use clap::Args;
use serde::{ser::SerializeStruct, Serialize};

use crate::{
    model::*,
    post::input_text,
    process::{split_segments, Processor},
};

#[derive(Debug, Args)]
pub struct Command {
    pub text: Vec<String>,
    #[arg(short, long)]
    pub pretty: bool,
}

struct SegmentEntities<'a> {
    segment: &'a str,
    entities: ExtractedEntities,
}

impl<'a> Serialize for SegmentEntities<'a> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("SegmentEntities", 2)?;
        state.serialize_field("segment", self.segment)?;
        state.serialize_field("entities", &self.entities)?;
        state.end()
    }
}

pub fn execute_command(processor: &Processor, cmd: &Command) -> Result<()> {
    let text = input_text(&cmd.text)?;
    let extracted = split_segments(&text)
        .into_iter()
        .map(|segment| SegmentEntities {
            segment,
            entities: processor.extractor().extract(segment),
        })
        .collect::<Vec<_>>();

    if cmd.pretty {
        println!("{}", serde_json::to_string_pretty(&extracted)?);
    } else {
        println!("{}", serde_json::to_string(&extracted)?);
    }

    Ok(())
}
