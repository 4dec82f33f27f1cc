use ocr_overlay_rust::{FontResolver, OverlayEngine, OverlayStyle, RegionDescriptor};

#[test]
fn builtin_font_plan_snapshot() {
    let engine = OverlayEngine::new(FontResolver::builtin(), OverlayStyle::default());
    let plan = engine.plan(&[
        RegionDescriptor::new("0,0,40,200", "一二三四"),
        RegionDescriptor::new("0,0,300,30", "一二三四五六七八九十一二三四五六七八九十"),
        RegionDescriptor::new("10,10,100,20", "hello"),
        RegionDescriptor::new("10,10,100", "缺"),
        RegionDescriptor::new("5,7,10,100", "字"),
    ]);
    insta::assert_snapshot!(serde_json::to_string_pretty(&plan).expect("json"));
}
