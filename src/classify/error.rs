use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, ClassifyError>;

/// Errors produced while encoding, decoding, classifying, and declassifying.
///
/// Schema drift (unknown fields, missing fields, values of an unexpected shape) is never reported
/// here; those paths fall back to defaults. Everything below is either corrupt input or caller misuse.
#[derive(Debug, Error)]
pub enum ClassifyError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Unknown leading file magic.
	#[error("unsupported compression or not a classify document (magic={magic:?})")]
	UnknownMagic {
		/// First up-to-4 bytes of the stream.
		magic: [u8; 4],
	},
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Not enough bytes remained for a requested read.
	#[error("unexpected eof at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// An escaped buffer contained `0xFF` followed by a byte other than `0x00`/`0x01`.
	#[error("bad escape byte 0x{got:02x} at offset {at}")]
	BadEscape {
		/// Offset of the byte following the escape marker.
		at: usize,
		/// Offending byte.
		got: u8,
	},
	/// A string buffer did not hold valid UTF-8.
	#[error("invalid utf-8 in string buffer at offset {at}")]
	InvalidUtf8 {
		/// Offset where the buffer started.
		at: usize,
	},
	/// A raw UTF-16 dictionary key had an odd length or unpaired surrogates.
	#[error("invalid utf-16 key at offset {at}")]
	InvalidUtf16 {
		/// Offset where the buffer started.
		at: usize,
	},
	/// Tag byte does not name a known data type or type-spec kind.
	#[error("invalid tag byte 0x{tag:02x} at offset {at}")]
	InvalidTag {
		/// Raw tag byte.
		tag: u8,
		/// Offset of the tag byte.
		at: usize,
	},
	/// An `End` marker appeared where a node was required.
	#[error("unexpected end marker at offset {at}")]
	UnexpectedEnd {
		/// Offset of the end marker.
		at: usize,
	},
	/// `DictOther` named a key type it cannot carry.
	#[error("invalid dictionary key type 0x{tag:02x} at offset {at}")]
	InvalidDictKeyType {
		/// Raw key-type byte.
		tag: u8,
		/// Offset of the key-type byte.
		at: usize,
	},
	/// Decimal header or length byte out of range.
	#[error("invalid decimal encoding at offset {at}")]
	InvalidDecimal {
		/// Offset of the decimal header.
		at: usize,
	},
	/// Timestamp tick count outside the representable range.
	#[error("invalid timestamp ticks {ticks}")]
	InvalidTimestamp {
		/// Raw tick count.
		ticks: i64,
	},
	/// Optimized integer did not fit the requested width.
	#[error("optimized integer overflows {target} at offset {at}")]
	OptimOverflow {
		/// Target integer type name.
		target: &'static str,
		/// Offset where the integer started.
		at: usize,
	},
	/// Bytes remained after the root node.
	#[error("trailing bytes after root node: {count}")]
	TrailingBytes {
		/// Unconsumed byte count.
		count: usize,
	},
	/// A `Ref` node pointed at an id that no node carried.
	#[error("unresolved reference id {id}")]
	UnresolvedReference {
		/// Missing reference id.
		id: u64,
	},
	/// A node carried a reference id but its tag has no `WithRefId` twin.
	#[error("reference id {id} cannot be attached to a {tag} node")]
	RefIdNotSupported {
		/// Reference id that could not be written.
		id: u64,
		/// Data type label of the node.
		tag: &'static str,
	},
	/// A follow-by-id field did not hold a deferred value of deferred type.
	#[error("follow-by-id field {field} on {type_name} must be a deferred value")]
	FollowIdShape {
		/// Declaring type name.
		type_name: String,
		/// Field name.
		field: String,
	},
	/// A follow-by-id side document was needed but no base directory was configured.
	#[error("follow-by-id value {id} requires a base directory")]
	FollowIdWithoutBase {
		/// Placeholder id.
		id: String,
	},
	/// A deferred value failed to evaluate earlier and has no generator left.
	#[error("deferred value {id} is unavailable")]
	DeferredUnavailable {
		/// Placeholder id.
		id: String,
	},
	/// Dictionary key type is not one of the supported scalar key kinds.
	#[error("unsupported dictionary key type {ty}")]
	UnsupportedKeyType {
		/// Rendered key type.
		ty: String,
	},
	/// Dictionary node mixed key kinds that share no wire form.
	#[error("dictionary mixes {first} and {second} keys")]
	MixedDictKeys {
		/// Key kind of the first entry.
		first: &'static str,
		/// Conflicting key kind.
		second: &'static str,
	},
	/// Type name is not registered in the schema.
	#[error("unknown type: {name}")]
	UnknownType {
		/// Requested type name.
		name: String,
	},
	/// Attempted to construct an abstract type.
	#[error("cannot instantiate abstract type {name}")]
	AbstractType {
		/// Abstract type name.
		name: String,
	},
	/// Two type definitions share a full name.
	#[error("duplicate type definition: {name}")]
	DuplicateType {
		/// Full type name.
		name: String,
	},
	/// A type definition names a base type that is not registered.
	#[error("type {name} has unknown base {base}")]
	UnknownBaseType {
		/// Derived type name.
		name: String,
		/// Missing base type name.
		base: String,
	},
	/// Base-type chain loops back on itself.
	#[error("type {name} inherits from itself")]
	InheritanceCycle {
		/// Type where the cycle was detected.
		name: String,
	},
	/// Decimal mantissa or scale exceeds the fixed-point range.
	#[error("decimal {value} is outside the 96-bit fixed-point range")]
	DecimalOutOfRange {
		/// Rendered decimal value.
		value: String,
	},
}
