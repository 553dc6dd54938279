use crate::classify::{ClassifyError, Result};

const DATA_TYPE_MASK: u8 = 0x1F;
const RESERVED_BIT: u8 = 0x20;
const TYPE_SPEC_SHIFT: u8 = 6;

/// Wire data type carried in the low five bits of every tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
	/// Closes a list or dictionary.
	End = 0,
	/// Null value.
	Null = 1,
	/// Boolean `false`.
	False = 2,
	/// Boolean `true`.
	True = 3,
	/// `u8`.
	Byte = 4,
	/// `i8`.
	SByte = 5,
	/// `i16`.
	Int16 = 6,
	/// `u16`.
	UInt16 = 7,
	/// `i32`.
	Int32 = 8,
	/// `u32`.
	UInt32 = 9,
	/// `i64`.
	Int64 = 10,
	/// `u64`.
	UInt64 = 11,
	/// `f32`.
	Single = 12,
	/// `f64`.
	Double = 13,
	/// UTC timestamp as ticks.
	DateTime = 14,
	/// Fixed-point decimal.
	Decimal = 15,
	/// Arbitrary-precision integer.
	BigInteger = 16,
	/// UTF-8 string.
	String = 17,
	/// Escaped byte buffer.
	RawData = 18,
	/// Escaped byte buffer followed by a reference id.
	RawDataWithRefId = 19,
	/// Two child nodes.
	KeyValuePair = 20,
	/// Dictionary with optim `i64` keys.
	DictInt64 = 21,
	/// [`DataType::DictInt64`] with a reference id.
	DictInt64WithRefId = 22,
	/// Dictionary with UTF-8 string keys.
	DictString = 23,
	/// [`DataType::DictString`] with a reference id.
	DictStringWithRefId = 24,
	/// Dictionary whose key type is named by a leading byte.
	DictOther = 25,
	/// [`DataType::DictOther`] with a reference id.
	DictOtherWithRefId = 26,
	/// Dictionary keyed by field name and declaring type.
	DictTwoStrings = 27,
	/// [`DataType::DictTwoStrings`] with a reference id.
	DictTwoStringsWithRefId = 28,
	/// Ordered list of nodes.
	List = 29,
	/// [`DataType::List`] with a reference id.
	ListWithRefId = 30,
	/// Back-reference to a node carrying a reference id.
	Ref = 31,
}

/// Plain tag paired with its reference-carrying twin.
const REF_ID_PAIRS: [(DataType, DataType); 6] = [
	(DataType::RawData, DataType::RawDataWithRefId),
	(DataType::DictInt64, DataType::DictInt64WithRefId),
	(DataType::DictString, DataType::DictStringWithRefId),
	(DataType::DictOther, DataType::DictOtherWithRefId),
	(DataType::DictTwoStrings, DataType::DictTwoStringsWithRefId),
	(DataType::List, DataType::ListWithRefId),
];

impl DataType {
	/// Decode the low five bits of a tag byte.
	pub fn from_bits(bits: u8) -> Option<Self> {
		use DataType::*;
		Some(match bits {
			0 => End,
			1 => Null,
			2 => False,
			3 => True,
			4 => Byte,
			5 => SByte,
			6 => Int16,
			7 => UInt16,
			8 => Int32,
			9 => UInt32,
			10 => Int64,
			11 => UInt64,
			12 => Single,
			13 => Double,
			14 => DateTime,
			15 => Decimal,
			16 => BigInteger,
			17 => String,
			18 => RawData,
			19 => RawDataWithRefId,
			20 => KeyValuePair,
			21 => DictInt64,
			22 => DictInt64WithRefId,
			23 => DictString,
			24 => DictStringWithRefId,
			25 => DictOther,
			26 => DictOtherWithRefId,
			27 => DictTwoStrings,
			28 => DictTwoStringsWithRefId,
			29 => List,
			30 => ListWithRefId,
			31 => Ref,
			_ => return None,
		})
	}

	/// Whether this tag has a reference-carrying twin.
	pub fn admits_ref_id(self) -> bool {
		REF_ID_PAIRS.iter().any(|(plain, _)| *plain == self)
	}

	/// Reference-carrying twin of a plain tag.
	pub fn with_ref_id(self) -> Option<Self> {
		REF_ID_PAIRS.iter().find(|(plain, _)| *plain == self).map(|(_, twin)| *twin)
	}

	/// Plain tag of a reference-carrying twin, or `self` when already plain.
	pub fn without_ref_id(self) -> Self {
		REF_ID_PAIRS.iter().find(|(_, twin)| *twin == self).map_or(self, |(plain, _)| *plain)
	}

	/// Whether this is a reference-carrying twin.
	pub fn has_ref_id(self) -> bool {
		REF_ID_PAIRS.iter().any(|(_, twin)| *twin == self)
	}

	/// Stable label for diagnostics and inspection output.
	pub fn label(self) -> &'static str {
		use DataType::*;
		match self {
			End => "End",
			Null => "Null",
			False => "False",
			True => "True",
			Byte => "Byte",
			SByte => "SByte",
			Int16 => "Int16",
			UInt16 => "UInt16",
			Int32 => "Int32",
			UInt32 => "UInt32",
			Int64 => "Int64",
			UInt64 => "UInt64",
			Single => "Single",
			Double => "Double",
			DateTime => "DateTime",
			Decimal => "Decimal",
			BigInteger => "BigInteger",
			String => "String",
			RawData => "RawData",
			RawDataWithRefId => "RawDataWithRefId",
			KeyValuePair => "KeyValuePair",
			DictInt64 => "DictInt64",
			DictInt64WithRefId => "DictInt64WithRefId",
			DictString => "DictString",
			DictStringWithRefId => "DictStringWithRefId",
			DictOther => "DictOther",
			DictOtherWithRefId => "DictOtherWithRefId",
			DictTwoStrings => "DictTwoStrings",
			DictTwoStringsWithRefId => "DictTwoStringsWithRefId",
			List => "List",
			ListWithRefId => "ListWithRefId",
			Ref => "Ref",
		}
	}
}

/// How a node's type annotation is spelled, carried in the high two bits of a tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSpecKind {
	/// No type annotation.
	None = 0,
	/// Short type name, resolved within the declared type's namespace.
	Short = 1,
	/// Fully qualified type name.
	Full = 2,
}

/// Pack a data type and type-spec kind into one tag byte.
pub fn pack_tag(data_type: DataType, spec: TypeSpecKind) -> u8 {
	(data_type as u8) | ((spec as u8) << TYPE_SPEC_SHIFT)
}

/// Split a tag byte read at `at` into data type and type-spec kind.
pub fn unpack_tag(tag: u8, at: usize) -> Result<(DataType, TypeSpecKind)> {
	if tag & RESERVED_BIT != 0 {
		return Err(ClassifyError::InvalidTag { tag, at });
	}

	let spec = match tag >> TYPE_SPEC_SHIFT {
		0 => TypeSpecKind::None,
		1 => TypeSpecKind::Short,
		2 => TypeSpecKind::Full,
		_ => return Err(ClassifyError::InvalidTag { tag, at }),
	};

	let data_type = DataType::from_bits(tag & DATA_TYPE_MASK).ok_or(ClassifyError::InvalidTag { tag, at })?;
	Ok((data_type, spec))
}
