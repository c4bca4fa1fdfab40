//! Built-in worksheet functions by function index

/// Name and argument count range of a built-in function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: u8,
    pub max_args: u8,
}

/// Function index used by tFuncVar to call an add-in or macro function;
/// the callee is the first argument.
pub(super) const EXTERNAL_FUNCTION: u16 = 255;

static FUNCTIONS: phf::Map<u16, FunctionDef> = phf::phf_map! {
    0u16 => FunctionDef { name: "COUNT", min_args: 0, max_args: 30 },
    1u16 => FunctionDef { name: "IF", min_args: 2, max_args: 3 },
    2u16 => FunctionDef { name: "ISNA", min_args: 1, max_args: 1 },
    3u16 => FunctionDef { name: "ISERROR", min_args: 1, max_args: 1 },
    4u16 => FunctionDef { name: "SUM", min_args: 0, max_args: 30 },
    5u16 => FunctionDef { name: "AVERAGE", min_args: 1, max_args: 30 },
    6u16 => FunctionDef { name: "MIN", min_args: 1, max_args: 30 },
    7u16 => FunctionDef { name: "MAX", min_args: 1, max_args: 30 },
    8u16 => FunctionDef { name: "ROW", min_args: 0, max_args: 1 },
    9u16 => FunctionDef { name: "COLUMN", min_args: 0, max_args: 1 },
    10u16 => FunctionDef { name: "NA", min_args: 0, max_args: 0 },
    11u16 => FunctionDef { name: "NPV", min_args: 2, max_args: 30 },
    12u16 => FunctionDef { name: "STDEV", min_args: 1, max_args: 30 },
    13u16 => FunctionDef { name: "DOLLAR", min_args: 1, max_args: 2 },
    14u16 => FunctionDef { name: "FIXED", min_args: 2, max_args: 3 },
    15u16 => FunctionDef { name: "SIN", min_args: 1, max_args: 1 },
    16u16 => FunctionDef { name: "COS", min_args: 1, max_args: 1 },
    17u16 => FunctionDef { name: "TAN", min_args: 1, max_args: 1 },
    18u16 => FunctionDef { name: "ATAN", min_args: 1, max_args: 1 },
    19u16 => FunctionDef { name: "PI", min_args: 0, max_args: 0 },
    20u16 => FunctionDef { name: "SQRT", min_args: 1, max_args: 1 },
    21u16 => FunctionDef { name: "EXP", min_args: 1, max_args: 1 },
    22u16 => FunctionDef { name: "LN", min_args: 1, max_args: 1 },
    23u16 => FunctionDef { name: "LOG10", min_args: 1, max_args: 1 },
    24u16 => FunctionDef { name: "ABS", min_args: 1, max_args: 1 },
    25u16 => FunctionDef { name: "INT", min_args: 1, max_args: 1 },
    26u16 => FunctionDef { name: "SIGN", min_args: 1, max_args: 1 },
    27u16 => FunctionDef { name: "ROUND", min_args: 2, max_args: 2 },
    28u16 => FunctionDef { name: "LOOKUP", min_args: 2, max_args: 3 },
    29u16 => FunctionDef { name: "INDEX", min_args: 2, max_args: 4 },
    30u16 => FunctionDef { name: "REPT", min_args: 2, max_args: 2 },
    31u16 => FunctionDef { name: "MID", min_args: 3, max_args: 3 },
    32u16 => FunctionDef { name: "LEN", min_args: 1, max_args: 1 },
    33u16 => FunctionDef { name: "VALUE", min_args: 1, max_args: 1 },
    34u16 => FunctionDef { name: "TRUE", min_args: 0, max_args: 0 },
    35u16 => FunctionDef { name: "FALSE", min_args: 0, max_args: 0 },
    36u16 => FunctionDef { name: "AND", min_args: 1, max_args: 30 },
    37u16 => FunctionDef { name: "OR", min_args: 1, max_args: 30 },
    38u16 => FunctionDef { name: "NOT", min_args: 1, max_args: 1 },
    39u16 => FunctionDef { name: "MOD", min_args: 2, max_args: 2 },
    40u16 => FunctionDef { name: "DCOUNT", min_args: 3, max_args: 3 },
    41u16 => FunctionDef { name: "DSUM", min_args: 3, max_args: 3 },
    42u16 => FunctionDef { name: "DAVERAGE", min_args: 3, max_args: 3 },
    43u16 => FunctionDef { name: "DMIN", min_args: 3, max_args: 3 },
    44u16 => FunctionDef { name: "DMAX", min_args: 3, max_args: 3 },
    45u16 => FunctionDef { name: "DSTDEV", min_args: 3, max_args: 3 },
    46u16 => FunctionDef { name: "VAR", min_args: 1, max_args: 30 },
    47u16 => FunctionDef { name: "DVAR", min_args: 3, max_args: 3 },
    48u16 => FunctionDef { name: "TEXT", min_args: 2, max_args: 2 },
    49u16 => FunctionDef { name: "LINEST", min_args: 1, max_args: 4 },
    50u16 => FunctionDef { name: "TREND", min_args: 1, max_args: 4 },
    51u16 => FunctionDef { name: "LOGEST", min_args: 1, max_args: 4 },
    52u16 => FunctionDef { name: "GROWTH", min_args: 1, max_args: 4 },
    56u16 => FunctionDef { name: "PV", min_args: 3, max_args: 5 },
    57u16 => FunctionDef { name: "FV", min_args: 3, max_args: 5 },
    58u16 => FunctionDef { name: "NPER", min_args: 3, max_args: 5 },
    59u16 => FunctionDef { name: "PMT", min_args: 3, max_args: 5 },
    60u16 => FunctionDef { name: "RATE", min_args: 3, max_args: 6 },
    61u16 => FunctionDef { name: "MIRR", min_args: 3, max_args: 3 },
    62u16 => FunctionDef { name: "IRR", min_args: 1, max_args: 2 },
    63u16 => FunctionDef { name: "RAND", min_args: 0, max_args: 0 },
    64u16 => FunctionDef { name: "MATCH", min_args: 2, max_args: 3 },
    65u16 => FunctionDef { name: "DATE", min_args: 3, max_args: 3 },
    66u16 => FunctionDef { name: "TIME", min_args: 3, max_args: 3 },
    67u16 => FunctionDef { name: "DAY", min_args: 1, max_args: 1 },
    68u16 => FunctionDef { name: "MONTH", min_args: 1, max_args: 1 },
    69u16 => FunctionDef { name: "YEAR", min_args: 1, max_args: 1 },
    70u16 => FunctionDef { name: "WEEKDAY", min_args: 1, max_args: 2 },
    71u16 => FunctionDef { name: "HOUR", min_args: 1, max_args: 1 },
    72u16 => FunctionDef { name: "MINUTE", min_args: 1, max_args: 1 },
    73u16 => FunctionDef { name: "SECOND", min_args: 1, max_args: 1 },
    74u16 => FunctionDef { name: "NOW", min_args: 0, max_args: 0 },
    75u16 => FunctionDef { name: "AREAS", min_args: 1, max_args: 1 },
    76u16 => FunctionDef { name: "ROWS", min_args: 1, max_args: 1 },
    77u16 => FunctionDef { name: "COLUMNS", min_args: 1, max_args: 1 },
    78u16 => FunctionDef { name: "OFFSET", min_args: 3, max_args: 5 },
    82u16 => FunctionDef { name: "SEARCH", min_args: 2, max_args: 3 },
    83u16 => FunctionDef { name: "TRANSPOSE", min_args: 1, max_args: 1 },
    86u16 => FunctionDef { name: "TYPE", min_args: 1, max_args: 1 },
    92u16 => FunctionDef { name: "SERIESSUM", min_args: 4, max_args: 4 },
    97u16 => FunctionDef { name: "ATAN2", min_args: 2, max_args: 2 },
    98u16 => FunctionDef { name: "ASIN", min_args: 1, max_args: 1 },
    99u16 => FunctionDef { name: "ACOS", min_args: 1, max_args: 1 },
    100u16 => FunctionDef { name: "CHOOSE", min_args: 2, max_args: 30 },
    101u16 => FunctionDef { name: "HLOOKUP", min_args: 3, max_args: 4 },
    102u16 => FunctionDef { name: "VLOOKUP", min_args: 3, max_args: 4 },
    105u16 => FunctionDef { name: "ISREF", min_args: 1, max_args: 1 },
    109u16 => FunctionDef { name: "LOG", min_args: 1, max_args: 2 },
    111u16 => FunctionDef { name: "CHAR", min_args: 1, max_args: 1 },
    112u16 => FunctionDef { name: "LOWER", min_args: 1, max_args: 1 },
    113u16 => FunctionDef { name: "UPPER", min_args: 1, max_args: 1 },
    114u16 => FunctionDef { name: "PROPER", min_args: 1, max_args: 1 },
    115u16 => FunctionDef { name: "LEFT", min_args: 1, max_args: 2 },
    116u16 => FunctionDef { name: "RIGHT", min_args: 1, max_args: 2 },
    117u16 => FunctionDef { name: "EXACT", min_args: 2, max_args: 2 },
    118u16 => FunctionDef { name: "TRIM", min_args: 1, max_args: 1 },
    119u16 => FunctionDef { name: "REPLACE", min_args: 4, max_args: 4 },
    120u16 => FunctionDef { name: "SUBSTITUTE", min_args: 3, max_args: 4 },
    121u16 => FunctionDef { name: "CODE", min_args: 1, max_args: 1 },
    124u16 => FunctionDef { name: "FIND", min_args: 2, max_args: 3 },
    125u16 => FunctionDef { name: "CELL", min_args: 1, max_args: 2 },
    126u16 => FunctionDef { name: "ISERR", min_args: 1, max_args: 1 },
    127u16 => FunctionDef { name: "ISTEXT", min_args: 1, max_args: 1 },
    128u16 => FunctionDef { name: "ISNUMBER", min_args: 1, max_args: 1 },
    129u16 => FunctionDef { name: "ISBLANK", min_args: 1, max_args: 1 },
    130u16 => FunctionDef { name: "T", min_args: 1, max_args: 1 },
    131u16 => FunctionDef { name: "N", min_args: 1, max_args: 1 },
    140u16 => FunctionDef { name: "DATEVALUE", min_args: 1, max_args: 1 },
    141u16 => FunctionDef { name: "TIMEVALUE", min_args: 1, max_args: 1 },
    142u16 => FunctionDef { name: "SLN", min_args: 3, max_args: 3 },
    143u16 => FunctionDef { name: "SYD", min_args: 4, max_args: 4 },
    144u16 => FunctionDef { name: "DDB", min_args: 4, max_args: 5 },
    148u16 => FunctionDef { name: "INDIRECT", min_args: 1, max_args: 2 },
    162u16 => FunctionDef { name: "CLEAN", min_args: 1, max_args: 1 },
    163u16 => FunctionDef { name: "MDETERM", min_args: 1, max_args: 1 },
    164u16 => FunctionDef { name: "MINVERSE", min_args: 1, max_args: 1 },
    165u16 => FunctionDef { name: "MMULT", min_args: 2, max_args: 2 },
    167u16 => FunctionDef { name: "IPMT", min_args: 4, max_args: 6 },
    168u16 => FunctionDef { name: "PPMT", min_args: 4, max_args: 6 },
    169u16 => FunctionDef { name: "COUNTA", min_args: 0, max_args: 30 },
    183u16 => FunctionDef { name: "PRODUCT", min_args: 0, max_args: 30 },
    184u16 => FunctionDef { name: "FACT", min_args: 1, max_args: 1 },
    189u16 => FunctionDef { name: "DPRODUCT", min_args: 3, max_args: 3 },
    190u16 => FunctionDef { name: "ISNONTEXT", min_args: 1, max_args: 1 },
    193u16 => FunctionDef { name: "STDEVP", min_args: 1, max_args: 30 },
    194u16 => FunctionDef { name: "VARP", min_args: 1, max_args: 30 },
    195u16 => FunctionDef { name: "DSTDEVP", min_args: 3, max_args: 3 },
    196u16 => FunctionDef { name: "DVARP", min_args: 3, max_args: 3 },
    197u16 => FunctionDef { name: "TRUNC", min_args: 1, max_args: 2 },
    198u16 => FunctionDef { name: "ISLOGICAL", min_args: 1, max_args: 1 },
    199u16 => FunctionDef { name: "DCOUNTA", min_args: 3, max_args: 3 },
    204u16 => FunctionDef { name: "USDOLLAR", min_args: 1, max_args: 2 },
    205u16 => FunctionDef { name: "FINDB", min_args: 2, max_args: 3 },
    206u16 => FunctionDef { name: "SEARCHB", min_args: 2, max_args: 3 },
    207u16 => FunctionDef { name: "REPLACEB", min_args: 4, max_args: 4 },
    208u16 => FunctionDef { name: "LEFTB", min_args: 1, max_args: 2 },
    209u16 => FunctionDef { name: "RIGHTB", min_args: 1, max_args: 2 },
    210u16 => FunctionDef { name: "MIDB", min_args: 3, max_args: 3 },
    211u16 => FunctionDef { name: "LENB", min_args: 1, max_args: 1 },
    212u16 => FunctionDef { name: "ROUNDUP", min_args: 2, max_args: 2 },
    213u16 => FunctionDef { name: "ROUNDDOWN", min_args: 2, max_args: 2 },
    214u16 => FunctionDef { name: "ASC", min_args: 1, max_args: 1 },
    215u16 => FunctionDef { name: "DBCS", min_args: 1, max_args: 1 },
    216u16 => FunctionDef { name: "RANK", min_args: 2, max_args: 3 },
    219u16 => FunctionDef { name: "ADDRESS", min_args: 2, max_args: 5 },
    220u16 => FunctionDef { name: "DAYS360", min_args: 2, max_args: 3 },
    221u16 => FunctionDef { name: "TODAY", min_args: 0, max_args: 0 },
    222u16 => FunctionDef { name: "VDB", min_args: 5, max_args: 7 },
    227u16 => FunctionDef { name: "MEDIAN", min_args: 1, max_args: 30 },
    228u16 => FunctionDef { name: "SUMPRODUCT", min_args: 1, max_args: 30 },
    229u16 => FunctionDef { name: "SINH", min_args: 1, max_args: 1 },
    230u16 => FunctionDef { name: "COSH", min_args: 1, max_args: 1 },
    231u16 => FunctionDef { name: "TANH", min_args: 1, max_args: 1 },
    232u16 => FunctionDef { name: "ASINH", min_args: 1, max_args: 1 },
    233u16 => FunctionDef { name: "ACOSH", min_args: 1, max_args: 1 },
    234u16 => FunctionDef { name: "ATANH", min_args: 1, max_args: 1 },
    235u16 => FunctionDef { name: "DGET", min_args: 3, max_args: 3 },
    244u16 => FunctionDef { name: "INFO", min_args: 1, max_args: 1 },
    247u16 => FunctionDef { name: "DB", min_args: 4, max_args: 5 },
    252u16 => FunctionDef { name: "FREQUENCY", min_args: 2, max_args: 2 },
    261u16 => FunctionDef { name: "ERROR.TYPE", min_args: 1, max_args: 1 },
    269u16 => FunctionDef { name: "AVEDEV", min_args: 1, max_args: 30 },
    270u16 => FunctionDef { name: "BETADIST", min_args: 3, max_args: 5 },
    271u16 => FunctionDef { name: "GAMMALN", min_args: 1, max_args: 1 },
    272u16 => FunctionDef { name: "BETAINV", min_args: 3, max_args: 5 },
    273u16 => FunctionDef { name: "BINOMDIST", min_args: 4, max_args: 4 },
    274u16 => FunctionDef { name: "CHIDIST", min_args: 2, max_args: 2 },
    275u16 => FunctionDef { name: "CHIINV", min_args: 2, max_args: 2 },
    276u16 => FunctionDef { name: "COMBIN", min_args: 2, max_args: 2 },
    277u16 => FunctionDef { name: "CONFIDENCE", min_args: 3, max_args: 3 },
    278u16 => FunctionDef { name: "CRITBINOM", min_args: 3, max_args: 3 },
    279u16 => FunctionDef { name: "EVEN", min_args: 1, max_args: 1 },
    280u16 => FunctionDef { name: "EXPONDIST", min_args: 3, max_args: 3 },
    281u16 => FunctionDef { name: "FDIST", min_args: 3, max_args: 3 },
    282u16 => FunctionDef { name: "FINV", min_args: 3, max_args: 3 },
    283u16 => FunctionDef { name: "FISHER", min_args: 1, max_args: 1 },
    284u16 => FunctionDef { name: "FISHERINV", min_args: 1, max_args: 1 },
    285u16 => FunctionDef { name: "FLOOR", min_args: 2, max_args: 2 },
    286u16 => FunctionDef { name: "GAMMADIST", min_args: 4, max_args: 4 },
    287u16 => FunctionDef { name: "GAMMAINV", min_args: 3, max_args: 3 },
    288u16 => FunctionDef { name: "CEILING", min_args: 2, max_args: 2 },
    289u16 => FunctionDef { name: "HYPGEOMDIST", min_args: 4, max_args: 4 },
    290u16 => FunctionDef { name: "LOGNORMDIST", min_args: 3, max_args: 3 },
    291u16 => FunctionDef { name: "LOGINV", min_args: 3, max_args: 3 },
    292u16 => FunctionDef { name: "NEGBINOMDIST", min_args: 3, max_args: 3 },
    293u16 => FunctionDef { name: "NORMDIST", min_args: 4, max_args: 4 },
    294u16 => FunctionDef { name: "NORMSDIST", min_args: 1, max_args: 1 },
    295u16 => FunctionDef { name: "NORMINV", min_args: 3, max_args: 3 },
    296u16 => FunctionDef { name: "NORMSINV", min_args: 1, max_args: 1 },
    297u16 => FunctionDef { name: "STANDARDIZE", min_args: 3, max_args: 3 },
    298u16 => FunctionDef { name: "ODD", min_args: 1, max_args: 1 },
    299u16 => FunctionDef { name: "PERMUT", min_args: 2, max_args: 2 },
    300u16 => FunctionDef { name: "POISSON", min_args: 3, max_args: 3 },
    301u16 => FunctionDef { name: "TDIST", min_args: 3, max_args: 3 },
    302u16 => FunctionDef { name: "WEIBULL", min_args: 4, max_args: 4 },
    303u16 => FunctionDef { name: "SUMXMY2", min_args: 2, max_args: 2 },
    304u16 => FunctionDef { name: "SUMX2MY2", min_args: 2, max_args: 2 },
    305u16 => FunctionDef { name: "SUMX2PY2", min_args: 2, max_args: 2 },
    306u16 => FunctionDef { name: "CHITEST", min_args: 2, max_args: 2 },
    307u16 => FunctionDef { name: "CORREL", min_args: 2, max_args: 2 },
    308u16 => FunctionDef { name: "COVAR", min_args: 2, max_args: 2 },
    309u16 => FunctionDef { name: "FORECAST", min_args: 3, max_args: 3 },
    310u16 => FunctionDef { name: "FTEST", min_args: 2, max_args: 2 },
    311u16 => FunctionDef { name: "INTERCEPT", min_args: 2, max_args: 2 },
    312u16 => FunctionDef { name: "PEARSON", min_args: 2, max_args: 2 },
    313u16 => FunctionDef { name: "RSQ", min_args: 2, max_args: 2 },
    314u16 => FunctionDef { name: "STEYX", min_args: 2, max_args: 2 },
    315u16 => FunctionDef { name: "SLOPE", min_args: 2, max_args: 2 },
    316u16 => FunctionDef { name: "TTEST", min_args: 4, max_args: 4 },
    317u16 => FunctionDef { name: "PROB", min_args: 3, max_args: 4 },
    318u16 => FunctionDef { name: "DEVSQ", min_args: 1, max_args: 30 },
    319u16 => FunctionDef { name: "GEOMEAN", min_args: 1, max_args: 30 },
    320u16 => FunctionDef { name: "HARMEAN", min_args: 1, max_args: 30 },
    321u16 => FunctionDef { name: "SUMSQ", min_args: 0, max_args: 30 },
    322u16 => FunctionDef { name: "KURT", min_args: 1, max_args: 30 },
    323u16 => FunctionDef { name: "SKEW", min_args: 1, max_args: 30 },
    324u16 => FunctionDef { name: "ZTEST", min_args: 2, max_args: 3 },
    325u16 => FunctionDef { name: "LARGE", min_args: 2, max_args: 2 },
    326u16 => FunctionDef { name: "SMALL", min_args: 2, max_args: 2 },
    327u16 => FunctionDef { name: "QUARTILE", min_args: 2, max_args: 2 },
    328u16 => FunctionDef { name: "PERCENTILE", min_args: 2, max_args: 2 },
    329u16 => FunctionDef { name: "PERCENTRANK", min_args: 2, max_args: 3 },
    330u16 => FunctionDef { name: "MODE", min_args: 1, max_args: 30 },
    331u16 => FunctionDef { name: "TRIMMEAN", min_args: 2, max_args: 2 },
    332u16 => FunctionDef { name: "TINV", min_args: 2, max_args: 2 },
    336u16 => FunctionDef { name: "CONCATENATE", min_args: 0, max_args: 30 },
    337u16 => FunctionDef { name: "POWER", min_args: 2, max_args: 2 },
    342u16 => FunctionDef { name: "RADIANS", min_args: 1, max_args: 1 },
    343u16 => FunctionDef { name: "DEGREES", min_args: 1, max_args: 1 },
    344u16 => FunctionDef { name: "SUBTOTAL", min_args: 2, max_args: 30 },
    345u16 => FunctionDef { name: "SUMIF", min_args: 2, max_args: 3 },
    346u16 => FunctionDef { name: "COUNTIF", min_args: 2, max_args: 2 },
    347u16 => FunctionDef { name: "COUNTBLANK", min_args: 1, max_args: 1 },
    350u16 => FunctionDef { name: "ISPMT", min_args: 4, max_args: 4 },
    351u16 => FunctionDef { name: "DATEDIF", min_args: 3, max_args: 3 },
    352u16 => FunctionDef { name: "DATESTRING", min_args: 1, max_args: 1 },
    353u16 => FunctionDef { name: "NUMBERSTRING", min_args: 2, max_args: 2 },
    354u16 => FunctionDef { name: "ROMAN", min_args: 1, max_args: 2 },
    358u16 => FunctionDef { name: "GETPIVOTDATA", min_args: 2, max_args: 30 },
    359u16 => FunctionDef { name: "HYPERLINK", min_args: 1, max_args: 2 },
    360u16 => FunctionDef { name: "PHONETIC", min_args: 1, max_args: 1 },
    361u16 => FunctionDef { name: "AVERAGEA", min_args: 1, max_args: 30 },
    362u16 => FunctionDef { name: "MAXA", min_args: 1, max_args: 30 },
    363u16 => FunctionDef { name: "MINA", min_args: 1, max_args: 30 },
    364u16 => FunctionDef { name: "STDEVPA", min_args: 1, max_args: 30 },
    365u16 => FunctionDef { name: "VARPA", min_args: 1, max_args: 30 },
    366u16 => FunctionDef { name: "STDEVA", min_args: 1, max_args: 30 },
    367u16 => FunctionDef { name: "VARA", min_args: 1, max_args: 30 },
    368u16 => FunctionDef { name: "BAHTTEXT", min_args: 1, max_args: 1 },
    369u16 => FunctionDef { name: "THAIDAYOFWEEK", min_args: 1, max_args: 1 },
    370u16 => FunctionDef { name: "THAIDIGIT", min_args: 1, max_args: 1 },
    371u16 => FunctionDef { name: "THAIMONTHOFYEAR", min_args: 1, max_args: 1 },
    372u16 => FunctionDef { name: "THAINUMSOUND", min_args: 1, max_args: 1 },
    373u16 => FunctionDef { name: "THAINUMSTRING", min_args: 1, max_args: 1 },
    374u16 => FunctionDef { name: "THAISTRINGLENGTH", min_args: 1, max_args: 1 },
    375u16 => FunctionDef { name: "ISTHAIDIGIT", min_args: 1, max_args: 1 },
    376u16 => FunctionDef { name: "ROUNDBAHTDOWN", min_args: 1, max_args: 1 },
    377u16 => FunctionDef { name: "ROUNDBAHTUP", min_args: 1, max_args: 1 },
    378u16 => FunctionDef { name: "THAIYEAR", min_args: 1, max_args: 1 },
    379u16 => FunctionDef { name: "RTD", min_args: 2, max_args: 30 },
};

/// Look up a built-in function by its index
pub fn function_def(index: u16) -> Option<&'static FunctionDef> {
    FUNCTIONS.get(&index)
}
