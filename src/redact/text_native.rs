//! The text-native redaction pipeline.
//!
//! Matched phrases are removed from the content model itself: the glyph
//! bytes are cut out of the text-showing operators (with a kerning
//! adjustment standing in for the removed advance, so surrounding text
//! keeps its place), a black box is painted over the match region, and
//! flagged logo payloads are destroyed. Drawing over rendered output alone
//! would leave the phrase extractable; rewriting the operators is what
//! makes the redaction irreversible.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, ObjectId, Stream, StringFormat};

use crate::error::{Error, Result};
use crate::extract::{
    self, digest_hex, CharSrc, DocumentImages, ImageAsset, PayloadDigest, TextSpan,
};
use crate::logo::{LogoDetector, PageContext};
use crate::model::{ActionKind, AuditLog, RedactionOutcome, Region, TargetSet};
use crate::redact::matcher::{find_merged_matches, MergedMatch};
use crate::redact::RedactOptions;
use crate::source::SourceDocument;

/// Black fill for text redaction boxes.
const BOX_BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
/// Light lavender fill for logo placeholders.
const BOX_PLACEHOLDER: (f32, f32, f32) = (0.93, 0.91, 0.96);
/// Advance units (1/1000 font size) substituted per removed character.
const CUT_ADVANCE_UNITS: i64 = 500;

/// Redact a text-native document.
pub fn redact_text_native(
    source: &SourceDocument,
    targets: &TargetSet,
    options: &RedactOptions,
    images: &DocumentImages,
) -> Result<RedactionOutcome> {
    let mut doc = source.clone_document();
    let mut audit = AuditLog::new();
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;

    // Logo verdicts are settled once per distinct payload, before any page
    // is touched, so every page sees the same decision.
    let flagged = if options.remove_logos {
        flag_logo_assets(source, images, options, page_count)?
    } else {
        BTreeMap::new()
    };

    for (&page_num, &page_id) in &pages {
        redact_page(
            &mut doc,
            source,
            page_num,
            page_id,
            targets,
            options,
            &flagged,
            &mut audit,
        )?;
        log::info!("redacted page {page_num}/{page_count}");
    }

    // Destroying the payload bytes is what makes logo removal irreversible;
    // dropping the draw operators alone would leave the artwork embedded.
    for asset in flagged.values() {
        blank_image_payload(&mut doc, asset.object_id);
    }

    scrub_info_metadata(&mut doc, targets);

    // Replaced content streams are unreachable now; drop them so the
    // original text operators do not survive as orphan objects.
    doc.prune_objects();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::Serialize(e.to_string()))?;

    Ok(RedactionOutcome::new(output, audit))
}

/// Evaluate the logo detector once per distinct asset.
fn flag_logo_assets<'a>(
    source: &SourceDocument,
    images: &'a DocumentImages,
    options: &RedactOptions,
    page_count: u32,
) -> Result<BTreeMap<PayloadDigest, &'a ImageAsset>> {
    let mut detector = LogoDetector::new(options.logo_config.clone(), page_count);
    let mut flagged = BTreeMap::new();

    for asset in images.assets() {
        let Some(&first_page) = asset.referencing_pages.first() else {
            continue;
        };
        let (width, height) = source.page_dimensions(first_page)?;
        let ctx = PageContext { width, height };
        if detector.is_logo(asset, &ctx) {
            flagged.insert(asset.digest, asset);
        }
    }
    Ok(flagged)
}

#[allow(clippy::too_many_arguments)]
fn redact_page(
    doc: &mut lopdf::Document,
    source: &SourceDocument,
    page_num: u32,
    page_id: ObjectId,
    targets: &TargetSet,
    options: &RedactOptions,
    flagged: &BTreeMap<PayloadDigest, &ImageAsset>,
    audit: &mut AuditLog,
) -> Result<()> {
    let (page_width, page_height) = source.page_dimensions(page_num)?;
    let page_text = extract::extract_page_text(doc, page_num)?;

    let folded: Vec<&str> = page_text.tokens.iter().map(|t| t.folded.as_str()).collect();
    let merged = find_merged_matches(&folded, targets);

    let content = extract::spans::page_content_bytes(doc, page_id)?;
    let mut operations = Content::decode(&content)
        .map_err(|e| Error::Parse(e.to_string()))?
        .operations;

    let mut overlays: Vec<(Region, (f32, f32, f32))> = Vec::new();
    let mut dirty = false;

    // Step 1: cut matched glyphs out of their operators.
    if !merged.is_empty() {
        dirty = true;
        let plan = build_removal_plan(&page_text, &merged);
        apply_removal_plan(&mut operations, &page_text.spans, &plan);

        for m in &merged {
            let region = match_region(&page_text, m).clamp(page_width, page_height);
            overlays.push((region.expand(1.0), BOX_BLACK));
            audit.record(page_num, ActionKind::TextRedacted, m.detail());
        }
    }

    // Step 2: drop draw references for flagged logos on this page.
    if !flagged.is_empty() {
        let page_logos: Vec<&&ImageAsset> = flagged
            .values()
            .filter(|a| a.referencing_pages.contains(&page_num))
            .collect();

        if !page_logos.is_empty() {
            let names: Vec<Vec<u8>> = page_logos
                .iter()
                .flat_map(|a| a.placements.iter())
                .filter(|p| p.page == page_num)
                .map(|p| p.name.clone())
                .collect();
            let before = operations.len();
            drop_draw_ops(&mut operations, &names);
            dirty |= operations.len() != before;

            for asset in &page_logos {
                audit.record(
                    page_num,
                    ActionKind::LogoRemoved,
                    format!(
                        "image {} ({}x{} px)",
                        digest_hex(&asset.digest),
                        asset.px_width,
                        asset.px_height
                    ),
                );
            }

            // Step 3: placeholders only where something was actually removed.
            if options.add_placeholders {
                for asset in &page_logos {
                    for placement in asset.placements.iter().filter(|p| p.page == page_num) {
                        overlays.push((
                            placement.region.clamp(page_width, page_height),
                            BOX_PLACEHOLDER,
                        ));
                        audit.record(
                            page_num,
                            ActionKind::PlaceholderInserted,
                            format!("image {}", digest_hex(&asset.digest)),
                        );
                    }
                }
            }
        }
    }

    if !dirty && overlays.is_empty() {
        return Ok(());
    }

    append_overlays(&mut operations, &overlays);

    let encoded = Content { operations }
        .encode()
        .map_err(|e| Error::Serialize(e.to_string()))?;
    set_page_content(doc, page_id, encoded)?;

    Ok(())
}

/// Point the page at a fresh content stream.
///
/// The previous stream objects become unreachable and are pruned before
/// serialization; they still hold the unredacted operators, so leaving
/// them as orphans would defeat the whole exercise.
pub(crate) fn set_page_content(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<()> {
    let stream_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content));
    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| Error::Serialize(e.to_string()))?;
    page_dict.set("Contents", Object::Reference(stream_id));
    Ok(())
}

// ---------------------------------------------------------------------------
// Match geometry and operator rewriting
// ---------------------------------------------------------------------------

/// Bounding region of a merged match: union of its tokens' regions.
fn match_region(page_text: &extract::PageText, m: &MergedMatch) -> Region {
    let mut region: Option<Region> = None;
    for token in &page_text.tokens[m.start..m.end] {
        region = Some(match region {
            Some(r) => r.union(&token.region),
            None => token.region,
        });
    }
    region.unwrap_or(Region::new(0.0, 0.0, 0.0, 0.0))
}

// ---------------------------------------------------------------------------
// Operator rewriting
// ---------------------------------------------------------------------------

/// Character ranges to cut, grouped by span index.
type RemovalPlan = HashMap<usize, Vec<(usize, usize)>>;

/// Work out which characters of which spans each merged match covers.
///
/// The covering range per span runs from the first matched token's start to
/// the last matched token's end, so interior separators ("Jane Doe"'s space)
/// go with the phrase.
fn build_removal_plan(page_text: &extract::PageText, merged: &[MergedMatch]) -> RemovalPlan {
    let mut plan: RemovalPlan = HashMap::new();

    for m in merged {
        let mut per_span: HashMap<usize, (usize, usize)> = HashMap::new();
        for token in &page_text.tokens[m.start..m.end] {
            per_span
                .entry(token.span)
                .and_modify(|(s, e)| {
                    *s = (*s).min(token.char_start);
                    *e = (*e).max(token.char_end);
                })
                .or_insert((token.char_start, token.char_end));
        }
        for (span, range) in per_span {
            plan.entry(span).or_default().push(range);
        }
    }

    for ranges in plan.values_mut() {
        ranges.sort();
    }
    plan
}

/// Rewrite every affected operator in place.
fn apply_removal_plan(operations: &mut Vec<Operation>, spans: &[TextSpan], plan: &RemovalPlan) {
    let mut replacements: HashMap<usize, Vec<Operation>> = HashMap::new();

    for (&span_idx, ranges) in plan {
        let span = &spans[span_idx];
        let Some(op) = operations.get(span.op_index) else {
            continue;
        };
        replacements.insert(span.op_index, rewrite_op(op, span, ranges));
    }

    if replacements.is_empty() {
        return;
    }

    let old = std::mem::take(operations);
    for (i, op) in old.into_iter().enumerate() {
        match replacements.remove(&i) {
            Some(new_ops) => operations.extend(new_ops),
            None => operations.push(op),
        }
    }
}

/// Rewrite one text-showing operator with the given character ranges cut.
///
/// Mappable spans get a surgical rewrite into a TJ whose removed stretches
/// become advance adjustments. Unmappable spans are dropped whole, the
/// conservative fallback that still guarantees the phrase is gone. The
/// line-movement side effects of ' and " survive either way.
fn rewrite_op(op: &Operation, span: &TextSpan, ranges: &[(usize, usize)]) -> Vec<Operation> {
    let mut prefix: Vec<Operation> = Vec::new();
    match op.operator.as_str() {
        "'" => prefix.push(Operation::new("T*", vec![])),
        "\"" => {
            if op.operands.len() >= 2 {
                prefix.push(Operation::new("Tw", vec![op.operands[0].clone()]));
                prefix.push(Operation::new("Tc", vec![op.operands[1].clone()]));
            }
            prefix.push(Operation::new("T*", vec![]));
        }
        _ => {}
    }

    if !span.mappable {
        return prefix;
    }

    let text_operand = if op.operator == "\"" {
        op.operands.get(2)
    } else {
        op.operands.first()
    };

    let items = match text_operand {
        Some(Object::String(bytes, _)) => {
            let mut items = rebuild_elements(&[(0usize, bytes.as_slice())], &span.chars, ranges);
            items.retain(|o| !matches!(o, Object::Null));
            items
        }
        Some(Object::Array(arr)) => {
            let strings: Vec<(usize, &[u8])> = arr
                .iter()
                .enumerate()
                .filter_map(|(i, o)| match o {
                    Object::String(bytes, _) => Some((i, bytes.as_slice())),
                    _ => None,
                })
                .collect();
            let mut rebuilt = rebuild_elements(&strings, &span.chars, ranges);
            // Keep the original kerning adjustments where they were.
            let mut items = Vec::new();
            let mut rebuilt_iter = rebuilt.drain(..);
            for o in arr {
                match o {
                    Object::String(_, _) => {
                        for item in rebuilt_iter.by_ref() {
                            if matches!(&item, Object::Null) {
                                break;
                            }
                            items.push(item);
                        }
                    }
                    other => items.push(other.clone()),
                }
            }
            items
        }
        _ => return prefix,
    };

    let mut ops = prefix;
    if !items.is_empty() {
        ops.push(Operation::new("TJ", vec![Object::Array(items)]));
    }
    ops
}

/// Rebuild string elements with cut ranges replaced by advance adjustments.
///
/// Output is a flat item list; `Object::Null` marks each element boundary so
/// the caller can re-interleave original non-string items.
fn rebuild_elements(
    strings: &[(usize, &[u8])],
    chars: &[CharSrc],
    ranges: &[(usize, usize)],
) -> Vec<Object> {
    let cut = |idx: usize| ranges.iter().any(|&(s, e)| idx >= s && idx < e);

    let mut items = Vec::new();
    for &(elem, bytes) in strings {
        let mut kept: Vec<u8> = Vec::new();
        let mut pending_cut_chars = 0usize;

        let flush_cut = |items: &mut Vec<Object>, pending: &mut usize| {
            if *pending > 0 {
                // TJ adjustments are subtracted from the advance; a negative
                // value opens a gap where the cut glyphs used to sit.
                items.push(Object::Integer(-(*pending as i64 * CUT_ADVANCE_UNITS)));
                *pending = 0;
            }
        };
        let flush_kept = |items: &mut Vec<Object>, kept: &mut Vec<u8>| {
            if !kept.is_empty() {
                items.push(Object::String(std::mem::take(kept), StringFormat::Literal));
            }
        };

        for (char_idx, src) in chars.iter().enumerate() {
            let CharSrc::Bytes {
                elem: e,
                offset,
                len,
            } = *src
            else {
                continue;
            };
            if e != elem {
                continue;
            }
            if cut(char_idx) {
                flush_kept(&mut items, &mut kept);
                pending_cut_chars += 1;
            } else {
                flush_cut(&mut items, &mut pending_cut_chars);
                kept.extend_from_slice(&bytes[offset..offset + len]);
            }
        }
        flush_kept(&mut items, &mut kept);
        flush_cut(&mut items, &mut pending_cut_chars);

        items.push(Object::Null); // element boundary marker
    }
    items
}

/// Drop `Do` operators that draw any of the given XObject names.
fn drop_draw_ops(operations: &mut Vec<Operation>, names: &[Vec<u8>]) {
    operations.retain(|op| {
        if op.operator != "Do" {
            return true;
        }
        match op.operands.first() {
            Some(Object::Name(name)) => !names.iter().any(|n| n == name),
            _ => true,
        }
    });
}

/// Append filled-rectangle overlays after the existing content.
fn append_overlays(operations: &mut Vec<Operation>, overlays: &[(Region, (f32, f32, f32))]) {
    for (region, (r, g, b)) in overlays {
        if region.is_empty() {
            continue;
        }
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "rg",
            vec![
                Object::Real(*r),
                Object::Real(*g),
                Object::Real(*b),
            ],
        ));
        operations.push(Operation::new(
            "re",
            vec![
                Object::Real(region.x0),
                Object::Real(region.y0),
                Object::Real(region.width()),
                Object::Real(region.height()),
            ],
        ));
        operations.push(Operation::new("f", vec![]));
        operations.push(Operation::new("Q", vec![]));
    }
}

// ---------------------------------------------------------------------------
// Logo payload destruction and metadata scrubbing
// ---------------------------------------------------------------------------

/// Overwrite an image object with a 1x1 white stub.
///
/// The original payload bytes cease to exist in the artifact while any
/// remaining resource references stay structurally valid.
fn blank_image_payload(doc: &mut lopdf::Document, object_id: ObjectId) {
    let stub = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0xFF],
    );
    doc.objects.insert(object_id, Object::Stream(stub));
}

/// Remove target phrases from Info dictionary string values.
fn scrub_info_metadata(doc: &mut lopdf::Document, targets: &TargetSet) {
    let Some(info_id) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|o| o.as_reference().ok())
    else {
        return;
    };

    let patterns: Vec<regex::Regex> = targets
        .targets()
        .iter()
        .filter_map(|t| {
            let escaped: Vec<String> = t
                .tokens()
                .iter()
                .map(|tok| regex::escape(tok))
                .collect();
            let pattern = format!(r"(?i)\b{}\b", escaped.join(r"[\W_]+"));
            regex::Regex::new(&pattern).ok()
        })
        .collect();

    let Ok(info) = doc.get_dictionary(info_id) else {
        return;
    };

    let mut scrubbed: Vec<(Vec<u8>, Object)> = Vec::new();
    for (key, value) in info.iter() {
        if let Object::String(bytes, _) = value {
            let text = extract::spans::decode_text_simple(bytes);
            let mut cleaned = text.clone();
            for pattern in &patterns {
                cleaned = pattern.replace_all(&cleaned, "").into_owned();
            }
            if cleaned != text {
                scrubbed.push((
                    key.clone(),
                    Object::String(cleaned.into_bytes(), StringFormat::Literal),
                ));
            }
        }
    }

    if scrubbed.is_empty() {
        return;
    }
    if let Ok(info) = doc.get_object_mut(info_id).and_then(|o| o.as_dict_mut()) {
        for (key, value) in scrubbed {
            info.set(key, value);
        }
    }
}
