//! Drivers wiring a [`FeatureSource`] through a conversion into a [`FeatureSink`].
//!
//! Both drivers validate their options, and check the configured fields against the source,
//! before the first record is pulled. Source and sink failures are returned as
//! [`Error::Source`] and [`Error::Sink`]; nothing is retried.
use crate::*;

pub const ET_ORDER: &str = "ET_ORDER";
pub const ET_IDP: &str = "ET_IDP";
pub const ET_IDR: &str = "ET_IDR";
pub const ET_X: &str = "ET_X";
pub const ET_Y: &str = "ET_Y";
pub const ET_Z: &str = "ET_Z";
pub const ET_M: &str = "ET_M";
pub const ET_ID: &str = "ET_ID";
pub const ET_FROM_ATT: &str = "ET_FromAtt";
pub const ET_TO_ATT: &str = "ET_ToAtt";

/// Declared length of the ring identifier field.
pub const RING_ID_LENGTH: usize = 50;

/// Counts from one conversion run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Records pulled from the source.
    pub read: usize,
    /// Records that contributed nothing (no usable geometry or identifier).
    pub skipped: usize,
    /// Records inserted into the sink.
    pub written: usize,
}

/// The point schema written by [`polygons_to_points`].
pub fn decomposition_schema(opts: &DecomposeOptions) -> Vec<FieldDef> {
    let mut fields = vec![
        if opts.calc_point_position {
            FieldDef::double(ET_ORDER)
        } else {
            FieldDef::long(ET_ORDER)
        },
        FieldDef::long(ET_IDP),
    ];
    if opts.strategy == Strategy::Vertex {
        fields.push(FieldDef::text(ET_IDR, Some(RING_ID_LENGTH)));
    }
    fields.push(FieldDef::double(ET_X));
    fields.push(FieldDef::double(ET_Y));
    if opts.retain_elevation_measure {
        fields.push(FieldDef::double(ET_Z));
        fields.push(FieldDef::double(ET_M));
    }
    fields
}

/// The polyline schema written by [`points_to_polylines`].
pub fn reconstruction_schema(opts: &ReconstructOptions) -> Vec<FieldDef> {
    let mut fields = vec![FieldDef::text(ET_ID, None)];
    if opts.link_field.is_some() {
        fields.push(FieldDef::text(ET_FROM_ATT, None));
        fields.push(FieldDef::text(ET_TO_ATT, None));
    }
    fields
}

fn check_fields<'a, S, I>(source: &S, fields: I) -> Result<()>
where
    S: FeatureSource,
    I: IntoIterator<Item = &'a str>,
{
    match fields.into_iter().find(|f| !source.has_field(f)) {
        Some(f) => Err(Error::MissingField(f.to_string())),
        None => Ok(()),
    }
}

fn pull<S: FeatureSource>(source: &mut S) -> Option<Result<Record>> {
    source
        .next_record()
        .map(|r| r.map_err(|e| Error::Source(Box::new(e))))
}

fn sink_err<E>(e: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::Sink(Box::new(e))
}

/// Decompose every polygon record of `source` into point records written to `sink`.
///
/// Records that are not polygons, or whose identifier field is not an integer, are logged and
/// skipped.
pub fn polygons_to_points<S, K>(
    source: &mut S,
    sink: &mut K,
    opts: DecomposeOptions,
) -> Result<Summary>
where
    S: FeatureSource,
    K: FeatureSink,
{
    let decomposer = Decomposer::new(opts)?;
    let opts = decomposer.options();
    check_fields(source, opts.id_field.as_deref())?;

    let zm = opts.retain_elevation_measure;
    let shape_type = ShapeType::new(GeometryKind::Point).with_zm(zm, zm);
    sink.create(shape_type, &decomposition_schema(opts)).map_err(sink_err)?;

    let mut summary = Summary::default();

    while let Some(record) = pull(source) {
        let record = record?;
        summary.read += 1;

        let Some(polygon) = to_polygon(&record, opts.id_field.as_deref()) else {
            summary.skipped += 1;
            continue;
        };
        log::trace!("decomposing polygon {}", polygon.source_id());

        for pt in decomposer.decompose(&polygon) {
            sink.insert(point_record(&pt, opts)).map_err(sink_err)?;
            summary.written += 1;
        }
    }

    log::debug!(
        "{} polygons read, {} skipped, {} points written",
        summary.read,
        summary.skipped,
        summary.written
    );
    Ok(summary)
}

fn to_polygon(record: &Record, id_field: Option<&str>) -> Option<Polygon> {
    let source_id = match id_field {
        Some(f) => match record.attr(f).and_then(AttrValue::as_i64) {
            Some(id) => id,
            None => {
                log::warn!("record {} has no integer `{}`, skipping", record.oid, f);
                return None;
            }
        },
        None => record.oid,
    };

    match &record.shape {
        Some(Shape::Polygon(rings)) => Some(Polygon::new(source_id, rings.iter().cloned())),
        _ => {
            log::warn!("record {} is not a polygon, skipping", record.oid);
            None
        }
    }
}

fn point_record(pt: &DecomposedPoint, opts: &DecomposeOptions) -> Record {
    let g = pt.geometry;
    let order = match pt.order {
        Some(Order::Index(i)) => AttrValue::Int(i as i64),
        Some(Order::Position(p)) => AttrValue::Float(p),
        None => AttrValue::Null,
    };

    let mut r = Record::new(pt.source_id, Some(Shape::Point(g)))
        .with_attr(ET_ORDER, order)
        .with_attr(ET_IDP, pt.source_id)
        .with_attr(ET_X, g.x)
        .with_attr(ET_Y, g.y);
    if opts.strategy == Strategy::Vertex {
        r.set(ET_IDR, pt.ring_id.clone());
    }
    if opts.retain_elevation_measure {
        r.set(ET_Z, g.z);
        r.set(ET_M, g.m);
    }
    r
}

/// Group the point records of `source` into polylines written to `sink`.
///
/// The whole source is read before anything is written, since a group's points need not arrive
/// together. Records without a coordinate are logged and skipped.
pub fn points_to_polylines<S, K>(
    source: &mut S,
    sink: &mut K,
    opts: ReconstructOptions,
) -> Result<Summary>
where
    S: FeatureSource,
    K: FeatureSink,
{
    let opts = opts.validate()?;
    check_fields(source, opts.fields())?;

    let src_type = source.shape_type();
    let has_z = opts.z_field.is_some() || src_type.has_z;
    let has_m = opts.m_field.is_some() || src_type.has_m;
    let shape_type = ShapeType::new(GeometryKind::Polyline).with_zm(has_z, has_m);
    sink.create(shape_type, &reconstruction_schema(&opts)).map_err(sink_err)?;

    let mut summary = Summary::default();
    let mut groups = PointGroups::new();

    while let Some(record) = pull(source) {
        let record = record?;
        summary.read += 1;

        match to_grouped_point(&record, &opts, has_z, has_m) {
            Some(p) => groups.push(p),
            None => summary.skipped += 1,
        }
    }

    let linked = opts.link_field.is_some();
    for line in groups.into_polylines(opts.order_field.is_some(), linked) {
        let mut r = Record::new(summary.written as i64, None);
        r.set(ET_ID, line.group_key.to_text());
        if linked {
            r.set(ET_FROM_ATT, line.from_attribute.clone());
            r.set(ET_TO_ATT, line.to_attribute.clone());
        }
        r.shape = Some(Shape::Polyline(line.vertices().to_vec()));

        sink.insert(r).map_err(sink_err)?;
        summary.written += 1;
    }

    log::debug!(
        "{} points read, {} skipped, {} polylines written",
        summary.read,
        summary.skipped,
        summary.written
    );
    Ok(summary)
}

fn to_grouped_point(
    record: &Record,
    opts: &ReconstructOptions,
    has_z: bool,
    has_m: bool,
) -> Option<GroupedPoint> {
    let Some(mut v) = record.shape.as_ref().and_then(Shape::first_vertex) else {
        log::warn!("record {} has no coordinate, skipping", record.oid);
        return None;
    };

    let numeric = |f: &Option<String>| {
        f.as_deref()
            .and_then(|f| record.attr(f))
            .and_then(AttrValue::as_f64)
    };
    if let Some(z) = numeric(&opts.z_field) {
        v.z = Some(z);
    }
    if let Some(m) = numeric(&opts.m_field) {
        v.m = Some(m);
    }
    if !has_z {
        v.z = None;
    }
    if !has_m {
        v.m = None;
    }

    let attr = |f: Option<&str>| f.and_then(|f| record.attr(f)).cloned();

    Some(GroupedPoint {
        geometry: v,
        group_key: attr(Some(opts.polyline_id_field.as_str())).unwrap_or(AttrValue::Null),
        order_key: attr(opts.order_field.as_deref()),
        link_value: attr(opts.link_field.as_deref()).and_then(|x| x.to_text()),
    })
}
