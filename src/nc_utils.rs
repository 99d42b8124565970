use netcdf::{
    types::{FloatType, IntType, NcVariableType},
    AttributeValue, Extents,
};

/// A type that can hold the values of any numeric netCDF variable
/// in its native type. It is best created by reading from a netCDF
/// variable with its `get_from` method.
pub enum NcArray {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl NcArray {
    /// Retrieve data from a netCDF variable and construct the appropriate variant.
    ///
    /// Returns `Ok(None)` for non-numeric variables (characters, strings,
    /// and the user-defined compound, opaque, enum and variable length types).
    pub fn get_from(var: &netcdf::Variable) -> netcdf::Result<Option<Self>> {
        let arr = match var.vartype() {
            NcVariableType::Int(IntType::I8) => Self::I8(var.get_values(Extents::All)?),
            NcVariableType::Int(IntType::I16) => Self::I16(var.get_values(Extents::All)?),
            NcVariableType::Int(IntType::I32) => Self::I32(var.get_values(Extents::All)?),
            NcVariableType::Int(IntType::I64) => Self::I64(var.get_values(Extents::All)?),
            NcVariableType::Int(IntType::U8) => Self::U8(var.get_values(Extents::All)?),
            NcVariableType::Int(IntType::U16) => Self::U16(var.get_values(Extents::All)?),
            NcVariableType::Int(IntType::U32) => Self::U32(var.get_values(Extents::All)?),
            NcVariableType::Int(IntType::U64) => Self::U64(var.get_values(Extents::All)?),
            NcVariableType::Float(FloatType::F32) => Self::F32(var.get_values(Extents::All)?),
            NcVariableType::Float(FloatType::F64) => Self::F64(var.get_values(Extents::All)?),
            _ => return Ok(None),
        };
        Ok(Some(arr))
    }

    /// Convert the values to `f64`, in file (row major) order.
    pub fn into_f64(self) -> Vec<f64> {
        match self {
            NcArray::I8(v) => v.into_iter().map(f64::from).collect(),
            NcArray::I16(v) => v.into_iter().map(f64::from).collect(),
            NcArray::I32(v) => v.into_iter().map(f64::from).collect(),
            NcArray::I64(v) => v.into_iter().map(|x| x as f64).collect(),
            NcArray::U8(v) => v.into_iter().map(f64::from).collect(),
            NcArray::U16(v) => v.into_iter().map(f64::from).collect(),
            NcArray::U32(v) => v.into_iter().map(f64::from).collect(),
            NcArray::U64(v) => v.into_iter().map(|x| x as f64).collect(),
            NcArray::F32(v) => v.into_iter().map(f64::from).collect(),
            NcArray::F64(v) => v,
        }
    }
}

/// Read a numeric attribute as an `f64`. Returns `None` if the attribute
/// is missing, unreadable, not numeric, or an empty array. For array
/// attributes the first element is used.
pub fn attribute_as_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    let value = var.attribute_value(name)?.ok()?;
    match value {
        AttributeValue::Uchar(x) => Some(x.into()),
        AttributeValue::Schar(x) => Some(x.into()),
        AttributeValue::Ushort(x) => Some(x.into()),
        AttributeValue::Short(x) => Some(x.into()),
        AttributeValue::Uint(x) => Some(x.into()),
        AttributeValue::Int(x) => Some(x.into()),
        AttributeValue::Ulonglong(x) => Some(x as f64),
        AttributeValue::Longlong(x) => Some(x as f64),
        AttributeValue::Float(x) => Some(x.into()),
        AttributeValue::Double(x) => Some(x),
        AttributeValue::Uchars(x) => x.first().map(|&v| v.into()),
        AttributeValue::Schars(x) => x.first().map(|&v| v.into()),
        AttributeValue::Ushorts(x) => x.first().map(|&v| v.into()),
        AttributeValue::Shorts(x) => x.first().map(|&v| v.into()),
        AttributeValue::Uints(x) => x.first().map(|&v| v.into()),
        AttributeValue::Ints(x) => x.first().map(|&v| v.into()),
        AttributeValue::Ulonglongs(x) => x.first().map(|&v| v as f64),
        AttributeValue::Longlongs(x) => x.first().map(|&v| v as f64),
        AttributeValue::Floats(x) => x.first().map(|&v| v.into()),
        AttributeValue::Doubles(x) => x.first().copied(),
        _ => None,
    }
}

/// Read a string attribute. Returns `None` if it is missing, unreadable
/// or not a string.
pub fn attribute_as_string(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(s) => Some(s.join(" ")),
        _ => None,
    }
}

/// Read a variable as `f64`s with CF-style masking and scaling applied.
///
/// Values equal to the `_FillValue` or `missing_value` attributes become NaN.
/// Then, if present, `scale_factor` multiplies and `add_offset` is added to
/// every value. Returns `Ok(None)` if the variable is not numeric.
pub fn read_decoded_values(var: &netcdf::Variable) -> netcdf::Result<Option<Vec<f64>>> {
    let mut values = match NcArray::get_from(var)? {
        Some(arr) => arr.into_f64(),
        None => return Ok(None),
    };

    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .into_iter()
        .filter_map(|att| attribute_as_f64(var, att))
        .collect();
    let scale = attribute_as_f64(var, "scale_factor");
    let offset = attribute_as_f64(var, "add_offset");

    for v in values.iter_mut() {
        if fills.iter().any(|f| f == v || (f.is_nan() && v.is_nan())) {
            *v = f64::NAN;
            continue;
        }
        if let Some(s) = scale {
            *v *= s;
        }
        if let Some(o) = offset {
            *v += o;
        }
    }

    Ok(Some(values))
}
