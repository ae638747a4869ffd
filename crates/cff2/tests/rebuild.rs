mod common;

use cff2_table::{
    Cff2Builder, Cff2Reader, ConsistencyError, DesignCoordinates, DictOperator, Error, FontHints,
    FormatError, GlyphHints, GlyphId, HintDirective, HintPayload, HintValue, Index, Operator, Options,
    PathCommand, TableJob, encode_values, rebuild_tables,
};
use common::{
    PrivateParts, TWO_FD_SELECT, build_table, dict_entry, init_logging, program, sample_parts,
    two_font_dict_parts,
};
use kurbo::Point;

fn stem(edge: f64, width: f64) -> (HintValue, HintValue) {
    (HintValue::new(edge), HintValue::new(width))
}

fn sample_payload() -> HintPayload {
    let (e0, w0) = stem(0.0, 20.0);
    let (e1, w1) = stem(10.0, 30.0);
    let hints = GlyphHints::new(vec![
        HintDirective::HStem { edge: e0, width: w0 },
        HintDirective::VStem { edge: e1, width: w1 },
        HintDirective::HintMask { before_path_op: 0, stems: vec![0, 1] },
        HintDirective::HintMask { before_path_op: 1, stems: vec![0] },
    ]);
    HintPayload::new().with_glyph(GlyphId::new(1), hints).with_font_hints(FontHints {
        std_hw: Some(40.0.into()),
        ..Default::default()
    })
}

fn rebuild(table: &[u8], payload: &HintPayload) -> Vec<u8> {
    let reader = Cff2Reader::new(table, Options::default());
    Cff2Builder::new(&reader).build(Some(payload)).unwrap()
}

#[test]
fn empty_payload_returns_original_bytes() {
    init_logging();
    let table = build_table(&sample_parts());
    let reader = Cff2Reader::new(&table, Options::default());
    let builder = Cff2Builder::new(&reader);
    assert_eq!(builder.build(None).unwrap(), table);
    assert_eq!(builder.build(Some(&HintPayload::new())).unwrap(), table);
}

#[test]
fn rebuilt_sections_are_contiguous() {
    init_logging();
    let table = build_table(&sample_parts());
    let rebuilt = rebuild(&table, &sample_payload());
    let reader = Cff2Reader::new(&rebuilt, Options::default());

    let header = reader.header().unwrap();
    let top = reader.top_dict().unwrap();
    let global_subrs = reader.global_subrs().unwrap();
    assert_eq!(global_subrs.offset(), header.top_dict_range().end);

    let charstrings = reader.charstrings().unwrap();
    assert_eq!(charstrings.offset(), global_subrs.offset() + global_subrs.size_in_bytes());

    let fd_array_offset = top.fd_array_offset.unwrap();
    assert_eq!(fd_array_offset, charstrings.offset() + charstrings.size_in_bytes());
    let fd_array = Index::read(&rebuilt, fd_array_offset).unwrap();

    let private = reader.private_dict().unwrap().unwrap();
    assert_eq!(private.offset, fd_array_offset + fd_array.size_in_bytes());
    assert_eq!(private.subrs_offset, Some(private.size));
    let local_subrs = reader.local_subrs().unwrap()[0].unwrap();

    let store = reader.variation_store_range().unwrap().unwrap();
    assert_eq!(store.start, local_subrs.offset() + local_subrs.size_in_bytes());
    assert_eq!(store.end, rebuilt.len());
    assert_eq!(top.variation_store_offset, Some(store.start));
}

#[test]
fn untouched_data_is_byte_identical() {
    let table = build_table(&sample_parts());
    let rebuilt = rebuild(&table, &sample_payload());
    let before = Cff2Reader::new(&table, Options::default());
    let after = Cff2Reader::new(&rebuilt, Options::default());

    assert_eq!(
        after.charstring(GlyphId::new(0)).unwrap(),
        before.charstring(GlyphId::new(0)).unwrap()
    );
    let store_before = before.variation_store_range().unwrap().unwrap();
    let store_after = after.variation_store_range().unwrap().unwrap();
    assert_eq!(&rebuilt[store_after], &table[store_before]);
    assert_eq!(after.global_subrs().unwrap().as_bytes(), before.global_subrs().unwrap().as_bytes());
    assert_eq!(
        after.local_subrs().unwrap()[0].unwrap().as_bytes(),
        before.local_subrs().unwrap()[0].unwrap().as_bytes()
    );

    // entries without an override keep their raw bytes
    let raw_entry = |reader: &Cff2Reader, data: &[u8], operator| {
        let private = reader.private_dict().unwrap().unwrap();
        let range = private.entry(operator).unwrap().range.clone();
        data[private.offset + range.start..private.offset + range.end].to_vec()
    };
    assert_eq!(
        raw_entry(&after, &rebuilt, DictOperator::BlueValues),
        raw_entry(&before, &table, DictOperator::BlueValues)
    );
    assert_eq!(
        raw_entry(&after, &rebuilt, DictOperator::StdVw),
        raw_entry(&before, &table, DictOperator::StdVw)
    );
}

#[test]
fn rehinted_glyph_keeps_its_outline() {
    let table = build_table(&sample_parts());
    let rebuilt = rebuild(&table, &sample_payload());
    let options = Options::new().axis_tags(["wght"]);
    let before = Cff2Reader::new(&table, options.clone());
    let after = Cff2Reader::new(&rebuilt, options);
    let glyph = GlyphId::new(1);

    let decoded = after.decode_glyph(glyph).unwrap();
    assert_eq!(decoded.path, before.decode_glyph(glyph).unwrap().path);
    assert_eq!(decoded.stem_hint_count, 2);
    let operators: Vec<Operator> = decoded.tokens().iter().map(|t| t.operator).collect();
    assert_eq!(
        operators,
        vec![
            Operator::HStemHm,
            Operator::VStemHm,
            Operator::HintMask,
            Operator::RMoveTo,
            Operator::HintMask,
            Operator::RLineTo,
            Operator::CallSubr,
            Operator::EndChar,
        ]
    );
    let bold = DesignCoordinates::from_iter([("wght", 1.0)]);
    assert_eq!(after.outline(glyph, &bold).unwrap(), before.outline(glyph, &bold).unwrap());

    let private = after.private_dict().unwrap().unwrap();
    assert_eq!(private.value(DictOperator::StdHw), Some(HintValue::new(40.0)));
    assert_eq!(private.value(DictOperator::StdVw), Some(HintValue::new(80.0)));
}

fn blended_blues() -> Vec<HintValue> {
    vec![
        HintValue::blended(-10.0, vec![-2.0]),
        HintValue::blended(0.0, vec![1.0]),
        HintValue::blended(490.0, vec![4.0]),
        HintValue::blended(510.0, vec![6.0]),
    ]
}

#[test]
fn private_dict_blend_arrays_round_trip() {
    let mut parts = sample_parts();
    let mut dict = Vec::new();
    encode_values(DictOperator::BlueValues, &blended_blues(), 1, &mut dict);
    dict_entry(&mut dict, DictOperator::StdVw, &[80.0]);
    parts.privates[0].dict = dict;
    let table = build_table(&parts);

    let reader = Cff2Reader::new(&table, Options::default());
    let private = reader.private_dict().unwrap().unwrap();
    assert!(private.entry(DictOperator::BlueValues).unwrap().is_blended());
    let blues = private.array(DictOperator::BlueValues).unwrap();
    assert_eq!(blues, blended_blues());

    // write the same values back explicitly and widen StdVW
    let payload = HintPayload::new().with_font_hints(FontHints {
        blue_values: Some(blues.clone()),
        std_vw: Some(HintValue::blended(80.0, vec![20.0])),
        ..Default::default()
    });
    let rebuilt = rebuild(&table, &payload);
    let after = Cff2Reader::new(&rebuilt, Options::default());
    let private = after.private_dict().unwrap().unwrap();
    assert_eq!(private.array(DictOperator::BlueValues).unwrap(), blended_blues());
    assert_eq!(private.value(DictOperator::StdVw), Some(HintValue::blended(80.0, vec![20.0])));
}

#[test]
fn blended_hints_need_a_variation_store() {
    let mut parts = sample_parts();
    parts.regions.clear();
    // drop the blend from glyph 1 so the table decodes without a store
    parts.charstrings[1] = program(&[(&[10.0, 20.0], &[21]), (&[], &[14])]);
    let table = build_table(&parts);
    let reader = Cff2Reader::new(&table, Options::default());
    let payload = HintPayload::new().with_font_hints(FontHints {
        std_vw: Some(HintValue::blended(80.0, vec![20.0])),
        ..Default::default()
    });
    assert_eq!(
        Cff2Builder::new(&reader).build(Some(&payload)),
        Err(ConsistencyError::BlendWithoutVariationStore.into())
    );
}

#[test]
fn delta_count_must_match_axis_count() {
    let table = build_table(&sample_parts());
    let reader = Cff2Reader::new(&table, Options::default());
    let payload = HintPayload::new().with_font_hints(FontHints {
        blue_shift: Some(HintValue::blended(7.0, vec![1.0, 2.0])),
        ..Default::default()
    });
    assert_eq!(
        Cff2Builder::new(&reader).build(Some(&payload)),
        Err(ConsistencyError::DeltaCountMismatch { expected: 1, actual: 2 }.into())
    );
}

#[test]
fn hints_inside_subroutines_are_rejected() {
    let mut parts = sample_parts();
    parts.privates[0].subrs = vec![program(&[(&[0.0, 20.0], &[1]), (&[], &[11])])];
    parts.charstrings[1] = program(&[(&[-107.0], &[10]), (&[10.0, 20.0], &[21]), (&[], &[14])]);
    let table = build_table(&parts);
    let reader = Cff2Reader::new(&table, Options::default());
    let payload = HintPayload::new().with_glyph(GlyphId::new(1), GlyphHints::default());
    assert_eq!(
        Cff2Builder::new(&reader).build(Some(&payload)),
        Err(Error::Format(FormatError::HintsInSubroutine { glyph: 1 }))
    );
}

#[test]
fn fd_select_survives_rebuild() {
    init_logging();
    let table = build_table(&two_font_dict_parts());
    let (edge, width) = stem(0.0, 20.0);
    let payload = HintPayload::new()
        .with_glyph(GlyphId::new(1), GlyphHints::new(vec![HintDirective::HStem { edge, width }]))
        .with_font_hints(FontHints { std_hw: Some(20.0.into()), ..Default::default() });
    let rebuilt = rebuild(&table, &payload);
    let reader = Cff2Reader::new(&rebuilt, Options::default());

    let top = reader.top_dict().unwrap();
    let charstrings = reader.charstrings().unwrap();
    let fd_select_offset = top.fd_select_offset.unwrap();
    assert_eq!(fd_select_offset, charstrings.offset() + charstrings.size_in_bytes());
    assert_eq!(&rebuilt[fd_select_offset..fd_select_offset + TWO_FD_SELECT.len()], &TWO_FD_SELECT);
    assert_eq!(top.fd_array_offset, Some(fd_select_offset + TWO_FD_SELECT.len()));

    assert_eq!(reader.font_dict_index(GlyphId::new(0)).unwrap(), 0);
    assert_eq!(reader.font_dict_index(GlyphId::new(1)).unwrap(), 1);
    for (glyph, dy) in [(0, -40.0), (1, -80.0)] {
        let decoded = reader.decode_glyph(GlyphId::new(glyph)).unwrap();
        assert_eq!(decoded.path[1], PathCommand::LineTo(Point::new(0.0, dy)));
    }
    assert_eq!(reader.decode_glyph(GlyphId::new(1)).unwrap().stem_hint_count, 1);
    for private in reader.private_dicts().unwrap() {
        assert_eq!(private.value(DictOperator::StdHw), Some(HintValue::new(20.0)));
    }
}

#[test]
fn hint_values_must_fit_a_charstring_operand() {
    let table = build_table(&sample_parts());
    let reader = Cff2Reader::new(&table, Options::default());
    let (edge, width) = stem(40000.0, 20.0);
    let payload = HintPayload::new()
        .with_glyph(GlyphId::new(1), GlyphHints::new(vec![HintDirective::HStem { edge, width }]));
    assert_eq!(
        Cff2Builder::new(&reader).build(Some(&payload)),
        Err(ConsistencyError::ValueOutOfRange { value: 40000.0 }.into())
    );
}

#[test]
fn private_dict_from_top_dict() {
    let mut parts = sample_parts();
    parts.fd_array = false;
    let table = build_table(&parts);
    let payload = HintPayload::new().with_font_hints(FontHints {
        blue_scale: Some(0.0625.into()),
        ..Default::default()
    });
    let rebuilt = rebuild(&table, &payload);
    let reader = Cff2Reader::new(&rebuilt, Options::default());
    assert!(reader.font_dicts().unwrap().is_empty());
    let private = reader.private_dict().unwrap().unwrap();
    assert_eq!(reader.top_dict().unwrap().private_dict_range, Some((private.size, private.offset)));
    assert_eq!(private.value(DictOperator::BlueScale), Some(HintValue::new(0.0625)));
    // local subroutines still resolve
    assert_eq!(reader.decode_glyph(GlyphId::new(1)).unwrap().path.len(), 3);
}

#[test]
fn rebuilds_tables_in_parallel() {
    init_logging();
    let first = build_table(&sample_parts());
    let mut parts = sample_parts();
    parts.privates = vec![PrivateParts::default()];
    parts.charstrings[1] = program(&[(&[10.0, 20.0], &[21]), (&[], &[14])]);
    let second = build_table(&parts);
    let payload = sample_payload();
    let jobs = [
        TableJob::new(&first, Options::default()).payload(&payload),
        TableJob::new(&second, Options::default()),
        TableJob::new(&[1, 0, 4], Options::default()).payload(&payload),
    ];
    let (results, batch) = rebuild_tables(&jobs);
    assert_eq!(results[0], Ok(rebuild(&first, &payload)));
    assert_eq!(results[1], Ok(second.clone()));
    assert!(results[2].is_err());
    assert_eq!((batch.succeeded, batch.failed), (2, 1));
    assert!(!batch.all_succeeded());
}
